//! ### English
//! C ABI bindings for canvas observers and canvas texture delivery.
//!
//! ### 中文
//! canvas observer 与 canvas 纹理交付的 C ABI 绑定。

use std::ffi::{c_char, c_void};
use std::sync::Arc;

use super::{XianOffscreenReleaseFn, cstr_to_str, foreign_release, into_release_pair, with_state};
use crate::engine::canvas::{CanvasFrame, CanvasObserver, CanvasTextureProducer};
use crate::engine::geometry::Rect;
use crate::engine::gpu::{Mailbox, SyncToken};

/// ### English
/// Receives a canvas texture. The embedder must call `release_callback(release_context, token)`
/// exactly once when it no longer samples the image.
///
/// ### 中文
/// 接收 canvas 纹理。宿主在不再采样图像后必须调用 `release_callback(release_context, token)` 且仅调用一次。
pub type XianOffscreenCanvasTextureFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    mailbox: *const Mailbox,
    sync_token: *const SyncToken,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    release_callback: XianOffscreenReleaseFn,
    release_context: *mut c_void,
);

/// ### English
/// Canvas observer supplied by the embedder. Two observers are the same when both the
/// `user_data` address and the callback address match.
///
/// ### 中文
/// 宿主提供的 canvas observer。`user_data` 地址与回调地址都相同时视为同一个 observer。
#[repr(C)]
#[derive(Clone, Copy)]
pub struct XianOffscreenCanvasObserver {
    pub user_data: *mut c_void,
    pub on_canvas_texture_paint: Option<XianOffscreenCanvasTextureFn>,
}

impl XianOffscreenCanvasObserver {
    fn callback_address(&self) -> Option<usize> {
        self.on_canvas_texture_paint.map(|callback| callback as usize)
    }

    pub(super) fn is_same_as(&self, other: &Self) -> bool {
        std::ptr::eq(self.user_data, other.user_data)
            && self.callback_address() == other.callback_address()
    }
}

pub(super) struct ForeignCanvasObserver(XianOffscreenCanvasObserver);

// SAFETY: the embedder guarantees its callback and `user_data` tolerate calls from any thread.
unsafe impl Send for ForeignCanvasObserver {}
unsafe impl Sync for ForeignCanvasObserver {}

impl CanvasObserver for ForeignCanvasObserver {
    fn on_canvas_texture_paint(&self, frame: CanvasFrame) {
        let Some(callback) = self.0.on_canvas_texture_paint else {
            frame.release.release_unused();
            return;
        };
        let CanvasFrame {
            mailbox,
            sync_token,
            rect,
            release,
        } = frame;
        let (release_callback, release_context) = into_release_pair(release);
        unsafe {
            callback(
                self.0.user_data,
                &mailbox,
                &sync_token,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                release_callback,
                release_context,
            )
        };
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Registers `observer` for canvas `uuid`, replacing any previous registration.
///
/// ### 中文
/// 为 canvas `uuid` 注册 `observer`，替换之前的注册项。
pub unsafe extern "C" fn xian_offscreen_add_canvas_observer(
    uuid: *const c_char,
    observer: *const XianOffscreenCanvasObserver,
) -> bool {
    let Some(uuid) = (unsafe { cstr_to_str(uuid) }) else {
        return false;
    };
    if observer.is_null() {
        return false;
    }
    let observer = Arc::new(ForeignCanvasObserver(unsafe { *observer }));

    with_state(|state| {
        let shared: Arc<dyn CanvasObserver> = observer.clone();
        state.canvas_registry.add(uuid, &shared);
        state.canvas_observers.insert(uuid.to_owned(), observer);
    });
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Removes the registration for `uuid` if it is `observer`. Returns whether it was removed.
///
/// ### 中文
/// 若 `uuid` 的注册项为 `observer`，则移除之。返回是否已移除。
pub unsafe extern "C" fn xian_offscreen_remove_canvas_observer(
    uuid: *const c_char,
    observer: *const XianOffscreenCanvasObserver,
) -> bool {
    let Some(uuid) = (unsafe { cstr_to_str(uuid) }) else {
        return false;
    };
    if observer.is_null() {
        return false;
    }
    let observer = unsafe { *observer };

    with_state(|state| {
        let Some(registered) = state
            .canvas_observers
            .get(uuid)
            .filter(|registered| registered.0.is_same_as(&observer))
            .cloned()
        else {
            return false;
        };
        let shared: Arc<dyn CanvasObserver> = registered;
        let removed = state.canvas_registry.remove(uuid, &shared);
        state.canvas_observers.remove(uuid);
        removed
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Delivers a texture produced for canvas `uuid` to its observer.
///
/// `release` (optional) is run exactly once: by the observer, or immediately with the empty sync
/// token when no observer is registered.
///
/// ### 中文
/// 把为 canvas `uuid` 产生的纹理交付给其 observer。
///
/// `release`（可选）恰好运行一次：由 observer 运行，或在无 observer 时立即以空 sync token 运行。
pub unsafe extern "C" fn xian_offscreen_canvas_texture_produced(
    uuid: *const c_char,
    mailbox: *const Mailbox,
    sync_token: *const SyncToken,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    release: Option<XianOffscreenReleaseFn>,
    release_context: *mut c_void,
) -> bool {
    let release = foreign_release(release, release_context);
    let Some(uuid) = (unsafe { cstr_to_str(uuid) }) else {
        release.release_unused();
        return false;
    };
    if mailbox.is_null() || sync_token.is_null() {
        release.release_unused();
        return false;
    }

    let producer = with_state(|state| CanvasTextureProducer::new(state.canvas_registry.clone()));
    producer.on_texture_produced(
        uuid,
        unsafe { *mailbox },
        unsafe { *sync_token },
        Rect::new(x, y, width, height),
        release,
    );
    true
}
