//! ### English
//! Frame delivery to the embedder: the per-view frame sink and paint observers keyed by view id.
//!
//! ### 中文
//! 向宿主交付帧：每个 view 的 frame sink，以及按 view id 注册的 paint observer。

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::engine::compositor::Bitmap;
use crate::engine::geometry::Rect;
use crate::engine::gpu::{Mailbox, ReleaseCallback, SyncToken};

/// ### English
/// A GPU-backed frame handed to the embedder.
///
/// Whoever receives it owns `release` and must run it once the image is no longer sampled.
///
/// ### 中文
/// 交给宿主的 GPU 帧。
///
/// 接收方持有 `release`，在不再采样该图像后必须运行它。
#[derive(Debug)]
pub struct TexturePaint {
    pub mailbox: Mailbox,
    pub sync_token: SyncToken,
    pub content_rect: Rect,
    pub damage_rect: Rect,
    pub is_popup: bool,
    pub release: ReleaseCallback,
}

impl TexturePaint {
    /// ### English
    /// The "popup closed" frame: zero mailbox, empty rects, nothing to release.
    ///
    /// ### 中文
    /// “popup 已关闭”帧：零 mailbox、空矩形、无需释放。
    pub fn popup_cleared() -> Self {
        Self {
            mailbox: Mailbox::default(),
            sync_token: SyncToken::default(),
            content_rect: Rect::default(),
            damage_rect: Rect::default(),
            is_popup: true,
            release: ReleaseCallback::noop(),
        }
    }
}

/// ### English
/// Where a view delivers its frames. Called on the UI thread.
///
/// ### 中文
/// view 交付帧的目的地。在 UI 线程上调用。
pub trait FrameSink {
    fn on_paint(&self, damage: Rect, bitmap: &Bitmap);

    fn on_texture_paint(&self, frame: TexturePaint);
}

/// ### English
/// Embedder-side receiver of a view's frames.
///
/// ### 中文
/// 宿主侧的 view 帧接收者。
pub trait PaintObserver {
    fn on_paint(&self, dirty: Rect, bitmap: &Bitmap);

    fn on_texture_paint(&self, frame: TexturePaint);
}

/// ### English
/// Paint observers keyed by view id. One observer per id; the last registration wins.
///
/// Observers are held weakly: the embedder owns them.
///
/// ### 中文
/// 按 view id 索引的 paint observer。每个 id 一个 observer，后注册者覆盖前者。
///
/// 以弱引用持有 observer：所有权在宿主。
#[derive(Default)]
pub struct PaintObserverRegistry {
    observers: RefCell<BTreeMap<i32, Weak<dyn PaintObserver>>>,
}

impl PaintObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: i32, observer: &Rc<dyn PaintObserver>) {
        self.observers
            .borrow_mut()
            .insert(id, Rc::downgrade(observer));
    }

    /// ### English
    /// Removes the registration for `id` if it is `observer`.
    ///
    /// ### 中文
    /// 若 `id` 的注册项是 `observer`，则移除之。
    pub fn remove(&self, id: i32, observer: &Rc<dyn PaintObserver>) -> bool {
        let mut observers = self.observers.borrow_mut();
        let same = observers
            .get(&id)
            .is_some_and(|weak| std::ptr::addr_eq(weak.as_ptr(), Rc::as_ptr(observer)));
        if same {
            observers.remove(&id);
        }
        same
    }

    pub fn get(&self, id: i32) -> Option<Rc<dyn PaintObserver>> {
        self.observers.borrow().get(&id).and_then(Weak::upgrade)
    }
}

/// ### English
/// Frame sink that forwards to the paint observer registered for `id`.
///
/// Texture frames with no observer are released immediately with the empty sync token.
///
/// ### 中文
/// 把帧转发给 `id` 所注册的 paint observer 的 frame sink。
///
/// 若无 observer，纹理帧会立即以空 sync token 释放。
pub struct ObserverFrameSink {
    registry: Rc<PaintObserverRegistry>,
    id: i32,
}

impl ObserverFrameSink {
    pub fn new(registry: Rc<PaintObserverRegistry>, id: i32) -> Self {
        Self { registry, id }
    }
}

impl FrameSink for ObserverFrameSink {
    fn on_paint(&self, damage: Rect, bitmap: &Bitmap) {
        if let Some(observer) = self.registry.get(self.id) {
            observer.on_paint(damage, bitmap);
        }
    }

    fn on_texture_paint(&self, frame: TexturePaint) {
        match self.registry.get(self.id) {
            Some(observer) => observer.on_texture_paint(frame),
            None => frame.release.release_unused(),
        }
    }
}

/// ### English
/// Set while a paint callback runs, so callers can detect reentrant composites.
///
/// Only exposed, never enforced.
///
/// ### 中文
/// 在 paint 回调执行期间置位，便于调用方检测重入的合成。
///
/// 仅对外暴露，不做强制。
#[derive(Clone, Default)]
pub struct PaintInProgress(Rc<Cell<bool>>);

impl PaintInProgress {
    pub fn get(&self) -> bool {
        self.0.get()
    }

    /// ### English
    /// Runs `paint` with the flag set, restoring the previous value afterwards.
    ///
    /// ### 中文
    /// 在置位状态下执行 `paint`，结束后恢复原值。
    pub(crate) fn run<R>(&self, paint: impl FnOnce() -> R) -> R {
        let previous = self.0.replace(true);
        let result = paint();
        self.0.set(previous);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[derive(Default)]
    struct Counting {
        paints: Cell<u32>,
        textures: Cell<u32>,
    }

    impl PaintObserver for Counting {
        fn on_paint(&self, _dirty: Rect, _bitmap: &Bitmap) {
            self.paints.set(self.paints.get() + 1);
        }

        fn on_texture_paint(&self, frame: TexturePaint) {
            self.textures.set(self.textures.get() + 1);
            frame.release.release_unused();
        }
    }

    #[test]
    fn sink_forwards_to_registered_observer() {
        let registry = Rc::new(PaintObserverRegistry::new());
        let observer = Rc::new(Counting::default());
        let observer_dyn: Rc<dyn PaintObserver> = observer.clone();
        registry.add(3, &observer_dyn);

        let sink = ObserverFrameSink::new(registry.clone(), 3);
        sink.on_paint(Rect::new(0, 0, 1, 1), &Bitmap::empty());
        sink.on_texture_paint(TexturePaint::popup_cleared());
        assert_eq!(observer.paints.get(), 1);
        assert_eq!(observer.textures.get(), 1);

        assert!(registry.remove(3, &observer_dyn));
        sink.on_paint(Rect::new(0, 0, 1, 1), &Bitmap::empty());
        assert_eq!(observer.paints.get(), 1);
    }

    #[test]
    fn flag_is_set_only_during_paint() {
        let flag = PaintInProgress::default();
        let inner = flag.clone();
        assert!(flag.run(|| inner.get()));
        assert!(!flag.get());
    }
}
