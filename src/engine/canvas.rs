//! ### English
//! Canvas observer registry: routes textures produced for an offscreen canvas (keyed by a uuid
//! string) to whichever observer registered for that id.
//!
//! ### 中文
//! canvas observer 注册表：按 uuid 字符串把离屏 canvas 产生的纹理路由到对应的 observer。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::engine::geometry::Rect;
use crate::engine::gpu::{Mailbox, ReleaseCallback, SyncToken};

/// ### English
/// One texture produced for a canvas.
///
/// ### 中文
/// 为某个 canvas 产生的一帧纹理。
#[derive(Debug)]
pub struct CanvasFrame {
    pub mailbox: Mailbox,
    pub sync_token: SyncToken,
    pub rect: Rect,
    pub release: ReleaseCallback,
}

/// ### English
/// Receiver of canvas textures. The observer owns `frame.release` and must run it exactly once.
///
/// ### 中文
/// canvas 纹理的接收方。observer 持有 `frame.release`，且必须恰好运行一次。
pub trait CanvasObserver: Send + Sync {
    fn on_canvas_texture_paint(&self, frame: CanvasFrame);
}

/// ### English
/// Result of [`CanvasObserverRegistry::dispatch`].
///
/// ### 中文
/// [`CanvasObserverRegistry::dispatch`] 的结果。
#[derive(Debug)]
#[must_use]
pub enum Dispatch {
    Delivered,
    /// ### English
    /// No live observer for the id. The caller still owns the release.
    ///
    /// ### 中文
    /// 该 id 没有存活的 observer。释放回调仍归调用方所有。
    Dropped(ReleaseCallback),
}

/// ### English
/// Process-wide map from canvas id to a non-owning observer reference.
///
/// Entries are only removed explicitly. An entry whose observer has been dropped behaves as if it
/// were absent.
///
/// ### 中文
/// 进程级的 canvas id → 非拥有 observer 引用映射。
///
/// 条目只会被显式移除。若 observer 已被释放，该条目等同于不存在。
#[derive(Default)]
pub struct CanvasObserverRegistry {
    observers: Mutex<BTreeMap<String, Weak<dyn CanvasObserver>>>,
}

impl CanvasObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Weak<dyn CanvasObserver>>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// ### English
    /// Registers `observer` under `id`, replacing any previous registration.
    ///
    /// ### 中文
    /// 以 `id` 注册 `observer`，覆盖之前的注册。
    pub fn add(&self, id: impl Into<String>, observer: &Arc<dyn CanvasObserver>) {
        let id = id.into();
        tracing::debug!(%id, "canvas observer added");
        self.lock().insert(id, Arc::downgrade(observer));
    }

    /// ### English
    /// Unregisters `id` if it is still registered to `observer`. Returns whether an entry was removed.
    ///
    /// ### 中文
    /// 若 `id` 仍注册为 `observer`，则移除之。返回是否移除了条目。
    pub fn remove(&self, id: &str, observer: &Arc<dyn CanvasObserver>) -> bool {
        let mut observers = self.lock();
        let same = observers
            .get(id)
            .is_some_and(|weak| std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(observer)));
        if same {
            observers.remove(id);
            tracing::debug!(%id, "canvas observer removed");
        }
        same
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock()
            .get(id)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ### English
    /// Forwards a produced texture to the observer registered for `id`.
    ///
    /// The lock is released before the observer runs, so observers may (un)register from inside
    /// the callback.
    ///
    /// ### 中文
    /// 把产生的纹理转发给 `id` 对应的 observer。
    ///
    /// 调用 observer 之前会先释放锁，因此 observer 可在回调内注册/注销。
    pub fn dispatch(&self, id: &str, frame: CanvasFrame) -> Dispatch {
        let observer = self.lock().get(id).and_then(Weak::upgrade);
        match observer {
            Some(observer) => {
                observer.on_canvas_texture_paint(frame);
                Dispatch::Delivered
            }
            None => {
                tracing::warn!(uuid = %id, "canvas texture produced without observer");
                Dispatch::Dropped(frame.release)
            }
        }
    }
}

/// ### English
/// Receives textures from the renderer and hands them to the registry. Frames nobody observes
/// are released right away with the empty sync token.
///
/// ### 中文
/// 从渲染器接收纹理并交给注册表。无人观察的帧会立即以空 sync token 释放。
#[derive(Clone)]
pub struct CanvasTextureProducer {
    registry: Arc<CanvasObserverRegistry>,
}

impl CanvasTextureProducer {
    pub fn new(registry: Arc<CanvasObserverRegistry>) -> Self {
        Self { registry }
    }

    pub fn on_texture_produced(
        &self,
        uuid: &str,
        mailbox: Mailbox,
        sync_token: SyncToken,
        bounds: Rect,
        release: ReleaseCallback,
    ) {
        let frame = CanvasFrame {
            mailbox,
            sync_token,
            rect: bounds,
            release,
        };
        if let Dispatch::Dropped(release) = self.registry.dispatch(uuid, frame) {
            release.release_unused();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counting(AtomicU32);

    impl CanvasObserver for Counting {
        fn on_canvas_texture_paint(&self, frame: CanvasFrame) {
            self.0.fetch_add(1, Ordering::SeqCst);
            frame.release.release_unused();
        }
    }

    fn frame(release: ReleaseCallback) -> CanvasFrame {
        CanvasFrame {
            mailbox: Mailbox::default(),
            sync_token: SyncToken::default(),
            rect: Rect::new(0, 0, 4, 4),
            release,
        }
    }

    #[test]
    fn last_registration_wins() {
        let registry = CanvasObserverRegistry::new();
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        let first_dyn: Arc<dyn CanvasObserver> = first.clone();
        let second_dyn: Arc<dyn CanvasObserver> = second.clone();

        registry.add("x", &first_dyn);
        registry.add("x", &second_dyn);
        assert!(matches!(
            registry.dispatch("x", frame(ReleaseCallback::noop())),
            Dispatch::Delivered
        ));
        assert_eq!(first.0.load(Ordering::SeqCst), 0);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);

        assert!(!registry.remove("x", &first_dyn));
        assert!(registry.remove("x", &second_dyn));
        assert!(registry.is_empty());
    }

    #[test]
    fn dead_observer_counts_as_absent() {
        let registry = CanvasObserverRegistry::new();
        let observer: Arc<dyn CanvasObserver> = Arc::new(Counting::default());
        registry.add("gone", &observer);
        drop(observer);

        assert!(!registry.contains("gone"));
        assert!(matches!(
            registry.dispatch("gone", frame(ReleaseCallback::noop())),
            Dispatch::Dropped(_)
        ));
    }

    #[test]
    fn producer_releases_unobserved_frames() {
        let released = Arc::new(AtomicU32::new(0));
        let producer = CanvasTextureProducer::new(Arc::new(CanvasObserverRegistry::new()));
        let r = released.clone();
        producer.on_texture_produced(
            "nobody",
            Mailbox::default(),
            SyncToken::default(),
            Rect::new(0, 0, 1, 1),
            ReleaseCallback::new(move |token| {
                assert_eq!(token, SyncToken::default());
                r.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
