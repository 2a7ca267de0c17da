//! ### English
//! Producer-side GPU context seam: fence creation/destruction and shared-image registration.
//!
//! ### 中文
//! 生产者侧 GPU 上下文接口：fence 的创建/销毁与共享图像的注册。

use std::sync::Arc;
use std::time::Duration;

use dpi::PhysicalSize;

use super::mailbox::Mailbox;
use crate::engine::error::{OffscreenError, OffscreenResult};
use crate::engine::lockfree::OneShot;

/// ### English
/// How long `insert_dependency` blocks for the producer to report a created fence.
///
/// ### 中文
/// `insert_dependency` 等待生产者回报 fence 创建完成的最长时间。
pub const FENCE_CREATION_TIMEOUT: Duration = Duration::from_secs(1);

/// ### English
/// Producer-assigned fence id (the GLES-side name of the fence).
///
/// ### 中文
/// 生产者分配的 fence id（GLES 侧的 fence 名称）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceId(pub u32);

/// ### English
/// A driver-level fence object that a secondary device can wait on.
///
/// `raw` is platform-defined: a `GLsync` cast to `u64` for GL, a shared NT handle for D3D11.
/// `0` never names a live fence.
///
/// ### 中文
/// 可被第二设备等待的驱动层 fence 对象。
///
/// `raw` 的含义依平台而定：GL 下为转换成 `u64` 的 `GLsync`，D3D11 下为共享 NT 句柄。`0` 永远不表示有效 fence。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuFence {
    raw: u64,
}

impl GpuFence {
    pub const fn from_raw(raw: u64) -> Self {
        Self { raw }
    }

    pub const fn raw(&self) -> u64 {
        self.raw
    }
}

/// ### English
/// A fence whose id is known but whose driver object may still be in flight.
///
/// The producer completes it through the paired [`FenceCompleter`], possibly from its driver
/// callback thread. `None` means the driver failed to create the fence.
///
/// ### 中文
/// id 已知、但驱动对象可能仍在创建中的 fence。
///
/// 生产者通过配对的 [`FenceCompleter`] 完成它（可能在驱动回调线程中）。`None` 表示驱动创建失败。
pub struct PendingFence {
    id: FenceId,
    arrival: Arc<OneShot<Option<GpuFence>>>,
}

/// ### English
/// Sender half of a [`PendingFence`].
///
/// ### 中文
/// [`PendingFence`] 的发送端。
pub struct FenceCompleter {
    arrival: Arc<OneShot<Option<GpuFence>>>,
}

impl PendingFence {
    /// ### English
    /// Creates a pending fence whose waiter is the calling thread.
    ///
    /// ### 中文
    /// 创建一个等待方为当前线程的 pending fence。
    pub fn new(id: FenceId) -> (Self, FenceCompleter) {
        let arrival = Arc::new(OneShot::for_current_thread());
        (
            Self {
                id,
                arrival: arrival.clone(),
            },
            FenceCompleter { arrival },
        )
    }

    /// ### English
    /// A pending fence that has already arrived (synchronous producers).
    ///
    /// ### 中文
    /// 已经到达的 pending fence（用于同步生产者）。
    pub fn ready(id: FenceId, fence: GpuFence) -> Self {
        let (pending, completer) = Self::new(id);
        completer.complete(Some(fence));
        pending
    }

    pub fn id(&self) -> FenceId {
        self.id
    }

    /// ### English
    /// Blocks until the producer reports the fence, or fails after `timeout`.
    ///
    /// ### 中文
    /// 阻塞直到生产者回报 fence；超过 `timeout` 则失败。
    pub fn wait(self, timeout: Duration) -> OffscreenResult<GpuFence> {
        match self.arrival.recv_timeout(timeout) {
            Some(Some(fence)) => Ok(fence),
            Some(None) => Err(OffscreenError::fence_creation(format!(
                "producer reported failure for fence {}",
                self.id.0
            ))),
            None => Err(OffscreenError::fence_creation(format!(
                "timed out after {timeout:?} waiting for fence {}",
                self.id.0
            ))),
        }
    }
}

impl FenceCompleter {
    /// ### English
    /// Reports the created fence (or `None` on driver failure). Later calls are ignored.
    ///
    /// ### 中文
    /// 回报已创建的 fence（驱动失败时为 `None`）。之后的调用会被忽略。
    pub fn complete(self, fence: Option<GpuFence>) {
        if !self.arrival.send(fence) {
            tracing::debug!("fence completion reported twice; ignoring");
        }
    }
}

/// ### English
/// The producer graphics context: the one the renderer's GPU work is submitted on.
///
/// All calls happen on the thread the context is current on. Implementations use interior
/// mutability because the context is shared as `Rc<dyn ProducerContext>`.
///
/// ### 中文
/// 生产者图形上下文：渲染器的 GPU 工作提交到该上下文。
///
/// 所有调用都发生在该上下文 current 的线程上。由于以 `Rc<dyn ProducerContext>` 共享，实现需使用内部可变性。
pub trait ProducerContext {
    /// ### English
    /// Queues a new fence after all work submitted so far.
    ///
    /// ### 中文
    /// 在目前已提交的所有工作之后插入一个新 fence。
    fn create_gpu_fence(&self) -> OffscreenResult<PendingFence>;

    /// ### English
    /// Destroys a fence previously produced by [`Self::create_gpu_fence`].
    ///
    /// ### 中文
    /// 销毁此前由 [`Self::create_gpu_fence`] 产生的 fence。
    fn destroy_gpu_fence(&self, id: FenceId, fence: GpuFence);

    /// ### English
    /// Wraps externally shared GPU memory as a shared image and names it with a fresh mailbox.
    ///
    /// ### 中文
    /// 将外部共享的 GPU 内存包装为共享图像，并以新的 mailbox 命名。
    fn create_shared_image(
        &self,
        shared_handle: u64,
        size: PhysicalSize<u32>,
    ) -> OffscreenResult<Mailbox>;

    /// ### English
    /// Releases a shared image created by [`Self::create_shared_image`].
    ///
    /// ### 中文
    /// 释放由 [`Self::create_shared_image`] 创建的共享图像。
    fn delete_shared_image(&self, mailbox: &Mailbox) -> OffscreenResult<()>;
}
