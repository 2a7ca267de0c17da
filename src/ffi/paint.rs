//! ### English
//! C ABI bindings for paint observers (per-view frame receivers).
//!
//! ### 中文
//! paint observer（按 view 接收帧）的 C ABI 绑定。

use std::ffi::c_void;
use std::rc::Rc;

use super::{XianOffscreenReleaseFn, into_release_pair, with_state};
use crate::engine::compositor::Bitmap;
use crate::engine::geometry::Rect;
use crate::engine::gpu::{Mailbox, SyncToken};
use crate::engine::paint::{PaintObserver, TexturePaint};

/// ### English
/// Receives a software frame. `pixels` (BGRA, `row_bytes` per row) is only valid during the call.
///
/// ### 中文
/// 接收软件帧。`pixels`（BGRA，每行 `row_bytes` 字节）仅在本次调用期间有效。
pub type XianOffscreenPaintFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    damage_x: i32,
    damage_y: i32,
    damage_width: i32,
    damage_height: i32,
    pixels: *const u8,
    width: u32,
    height: u32,
    row_bytes: u32,
);

/// ### English
/// Receives a GPU frame. The embedder must call `release_callback(release_context, token)`
/// exactly once. A popup-closed notification carries a zero mailbox and an empty rect.
///
/// ### 中文
/// 接收 GPU 帧。宿主必须调用 `release_callback(release_context, token)` 且仅调用一次。
/// popup 关闭通知携带零 mailbox 与空矩形。
pub type XianOffscreenTexturePaintFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    mailbox: *const Mailbox,
    sync_token: *const SyncToken,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    is_popup: bool,
    release_callback: XianOffscreenReleaseFn,
    release_context: *mut c_void,
);

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Paint observer supplied by the embedder. Either callback may be NULL.
///
/// ### 中文
/// 宿主提供的 paint observer。任一回调都可为 NULL。
pub struct XianOffscreenPaintObserver {
    pub user_data: *mut c_void,
    pub on_paint: Option<XianOffscreenPaintFn>,
    pub on_texture_paint: Option<XianOffscreenTexturePaintFn>,
}

pub(super) struct ForeignPaintObserver(XianOffscreenPaintObserver);

impl PaintObserver for ForeignPaintObserver {
    fn on_paint(&self, dirty: Rect, bitmap: &Bitmap) {
        let Some(callback) = self.0.on_paint else {
            return;
        };
        let size = bitmap.size();
        unsafe {
            callback(
                self.0.user_data,
                dirty.x,
                dirty.y,
                dirty.width,
                dirty.height,
                bitmap.pixels().as_ptr(),
                size.width,
                size.height,
                bitmap.row_bytes() as u32,
            )
        };
    }

    fn on_texture_paint(&self, frame: TexturePaint) {
        let Some(callback) = self.0.on_texture_paint else {
            frame.release.release_unused();
            return;
        };
        let TexturePaint {
            mailbox,
            sync_token,
            content_rect,
            damage_rect: _,
            is_popup,
            release,
        } = frame;
        let (release_callback, release_context) = into_release_pair(release);
        unsafe {
            callback(
                self.0.user_data,
                &mailbox,
                &sync_token,
                content_rect.x,
                content_rect.y,
                content_rect.width,
                content_rect.height,
                is_popup,
                release_callback,
                release_context,
            )
        };
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Registers `observer` for views created with `observer_id`, replacing any previous one.
///
/// ### 中文
/// 为以 `observer_id` 创建的 view 注册 `observer`，替换之前的注册项。
pub unsafe extern "C" fn xian_offscreen_add_paint_observer(
    observer_id: i32,
    observer: *const XianOffscreenPaintObserver,
) -> bool {
    if observer.is_null() {
        return false;
    }
    let observer = Rc::new(ForeignPaintObserver(unsafe { *observer }));

    with_state(|state| {
        let shared: Rc<dyn PaintObserver> = observer.clone();
        state.paint_registry.add(observer_id, &shared);
        state.paint_observers.insert(observer_id, observer);
    });
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Removes the paint observer registered for `observer_id`. Frames for its views are then
/// released without being shown.
///
/// ### 中文
/// 移除为 `observer_id` 注册的 paint observer。此后其 view 的帧会直接释放而不显示。
pub extern "C" fn xian_offscreen_remove_paint_observer(observer_id: i32) -> bool {
    with_state(|state| {
        let Some(registered) = state.paint_observers.remove(&observer_id) else {
            return false;
        };
        let shared: Rc<dyn PaintObserver> = registered;
        state.paint_registry.remove(observer_id, &shared)
    })
}
