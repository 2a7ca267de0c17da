//! ### English
//! Deferred work for the view host.
//!
//! Tasks are sent over a `crossbeam-channel` queue so that a [`TaskPoster`] can be handed to
//! other threads; they only ever run on the UI thread, inside
//! [`OffscreenViewHost::run_pending_tasks`].
//!
//! ### 中文
//! view host 的延后任务。
//!
//! 任务经由 `crossbeam-channel` 队列发送，因此 [`TaskPoster`] 可以交给其他线程；任务只会在 UI 线程的
//! [`OffscreenViewHost::run_pending_tasks`] 中执行。

use std::time::{Duration, Instant};

use crossbeam_channel as channel;

use super::{OffscreenViewHost, ViewId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Task {
    /// ### English
    /// Trailing resize after a resize hold was released.
    ///
    /// ### 中文
    /// resize hold 释放后的尾随 resize。
    WasResized(ViewId),
    CancelWidget(ViewId),
    /// ### English
    /// One forced redraw; reschedules itself while `remaining > 0`.
    ///
    /// ### 中文
    /// 一次强制重绘；在 `remaining > 0` 时会重新安排自身。
    ForceRenderFrames {
        view: ViewId,
        remaining: u32,
        delay: Duration,
    },
}

/// ### English
/// A queued task and the instant it becomes due. `None` runs on the next pass.
///
/// ### 中文
/// 排队中的任务及其到期时刻。`None` 表示在下一轮执行。
#[derive(Debug)]
pub(super) struct PostedTask {
    task: Task,
    due: Option<Instant>,
}

/// ### English
/// Cloneable, `Send` handle that posts "resync visual properties" requests for a view from any
/// thread. The request runs on the next [`OffscreenViewHost::run_pending_tasks`].
///
/// ### 中文
/// 可克隆且 `Send` 的句柄，可在任意线程为某个 view 投递“重新同步视觉属性”请求。请求会在下一次
/// [`OffscreenViewHost::run_pending_tasks`] 时执行。
#[derive(Clone, Debug)]
pub struct TaskPoster {
    tx: channel::Sender<PostedTask>,
}

impl TaskPoster {
    /// ### English
    /// Returns `false` once the host is gone.
    ///
    /// ### 中文
    /// host 已销毁时返回 `false`。
    pub fn post_resize(&self, view: ViewId) -> bool {
        self.tx
            .send(PostedTask {
                task: Task::WasResized(view),
                due: None,
            })
            .is_ok()
    }
}

impl OffscreenViewHost {
    pub fn task_poster(&self) -> TaskPoster {
        TaskPoster {
            tx: self.task_tx.clone(),
        }
    }

    /// ### English
    /// Number of queued tasks, including delayed ones not yet due.
    ///
    /// ### 中文
    /// 已排队的任务数量，包括尚未到期的延时任务。
    pub fn pending_task_count(&self) -> usize {
        self.task_rx.len() + self.delayed.len()
    }

    /// ### English
    /// Runs every task that is due at `now` and returns how many ran.
    ///
    /// Delays count from the moment a task was posted, not from the pass that first sees it.
    /// Tasks posted while running are picked up by the next call, so a self-rescheduling task
    /// cannot starve the caller.
    ///
    /// ### 中文
    /// 执行所有在 `now` 时刻到期的任务，返回执行数量。
    ///
    /// 延时从任务投递时开始计算，而不是从首次看到它的那一轮开始。
    /// 执行期间新投递的任务留到下一次调用处理，因此自我重排的任务不会饿死调用方。
    pub fn run_pending_tasks(&mut self, now: Instant) -> usize {
        let mut due = Vec::new();
        for posted in self.task_rx.try_iter() {
            match posted.due {
                None => due.push(posted.task),
                Some(at) => self.delayed.push((at, posted.task)),
            }
        }

        let mut index = 0;
        while index < self.delayed.len() {
            if self.delayed[index].0 <= now {
                let (_, task) = self.delayed.remove(index);
                due.push(task);
            } else {
                index += 1;
            }
        }

        let ran = due.len();
        for task in due {
            self.run_task(task);
        }
        ran
    }

    pub(super) fn post(&self, task: Task, delay: Duration) {
        // The receiver lives in `self`, so the send cannot fail.
        let due = (!delay.is_zero()).then(|| Instant::now() + delay);
        let _ = self.task_tx.send(PostedTask { task, due });
    }

    fn run_task(&mut self, task: Task) {
        tracing::trace!(?task, "running posted task");
        match task {
            Task::WasResized(view) => {
                if self.contains(view) {
                    self.resized(view);
                }
            }
            Task::CancelWidget(view) => {
                if self.contains(view) {
                    self.cancel_view(view);
                }
            }
            Task::ForceRenderFrames {
                view,
                remaining,
                delay,
            } => self.force_render_frames(view, remaining, delay),
        }
    }
}
