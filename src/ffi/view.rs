//! ### English
//! C ABI bindings for view lifecycle, render-host controls and frame input.
//!
//! Frame callbacks run synchronously inside these calls; do not call back into the same host
//! from a paint observer.
//!
//! ### 中文
//! view 生命周期、render host 控制与帧输入的 C ABI 绑定。
//!
//! 帧回调在这些调用内同步执行；不要在 paint observer 中重入同一个 host。

use std::ffi::c_void;
use std::rc::Rc;
use std::time::Duration;

use dpi::{LogicalSize, PhysicalSize};

use super::host::XianOffscreenHost;
use super::{XianOffscreenReleaseFn, foreign_release, with_state};
use crate::engine::compositor::{BYTES_PER_PIXEL, Bitmap};
use crate::engine::error::OffscreenResult;
use crate::engine::flags::{
    KNOWN_VIEW_FLAGS, XIAN_OFFSCREEN_VIEW_FLAG_NOT_PAINTING,
    XIAN_OFFSCREEN_VIEW_FLAG_START_HIDDEN, XIAN_OFFSCREEN_VIEW_FLAG_TRANSPARENT, has_flag,
};
use crate::engine::geometry::Rect;
use crate::engine::gpu::{Mailbox, SyncToken};
use crate::engine::offscreen::{
    Color, LocalSurfaceId, OffscreenViewHost, OffscreenViewInit, RenderWidgetHost, ViewId,
};
use crate::engine::paint::{ObserverFrameSink, TexturePaint};

type HostFn = unsafe extern "C" fn(user_data: *mut c_void);

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Rendering-engine callbacks for one view. Every callback may be NULL.
///
/// ### 中文
/// 单个 view 的渲染引擎回调。任一回调都可为 NULL。
pub struct XianOffscreenRenderHost {
    pub user_data: *mut c_void,
    pub was_shown: Option<HostFn>,
    pub was_hidden: Option<HostFn>,
    pub synchronize_visual_properties: Option<HostFn>,
    pub embed_surface: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            parent_sequence: u32,
            child_sequence: u32,
            embed_token: u64,
            width: u32,
            height: u32,
        ),
    >,
    pub lost_capture: Option<HostFn>,
    pub set_begin_frames_enabled: Option<unsafe extern "C" fn(user_data: *mut c_void, enabled: bool)>,
    /// ### English
    /// Vsync interval in microseconds.
    ///
    /// ### 中文
    /// vsync 间隔（微秒）。
    pub set_vsync_interval: Option<unsafe extern "C" fn(user_data: *mut c_void, interval_us: u64)>,
    pub set_background_color: Option<unsafe extern "C" fn(user_data: *mut c_void, argb: u32)>,
    /// ### English
    /// Redraw request; `full` means the whole view and the rect is then empty.
    ///
    /// ### 中文
    /// 重绘请求；`full` 表示整个 view，此时矩形为空。
    pub invalidate: Option<
        unsafe extern "C" fn(user_data: *mut c_void, x: i32, y: i32, width: i32, height: i32, full: bool),
    >,
    pub shutdown_widget: Option<HostFn>,
}

struct ForeignRenderHost(XianOffscreenRenderHost);

impl ForeignRenderHost {
    fn notify(&self, callback: Option<HostFn>) {
        if let Some(callback) = callback {
            unsafe { callback(self.0.user_data) };
        }
    }
}

impl RenderWidgetHost for ForeignRenderHost {
    fn was_shown(&self) {
        self.notify(self.0.was_shown);
    }

    fn was_hidden(&self) {
        self.notify(self.0.was_hidden);
    }

    fn synchronize_visual_properties(&self) {
        self.notify(self.0.synchronize_visual_properties);
    }

    fn embed_surface(&self, surface_id: LocalSurfaceId, size: PhysicalSize<u32>) {
        if let Some(callback) = self.0.embed_surface {
            unsafe {
                callback(
                    self.0.user_data,
                    surface_id.parent_sequence,
                    surface_id.child_sequence,
                    surface_id.embed_token,
                    size.width,
                    size.height,
                )
            };
        }
    }

    fn lost_capture(&self) {
        self.notify(self.0.lost_capture);
    }

    fn set_begin_frames_enabled(&self, enabled: bool) {
        if let Some(callback) = self.0.set_begin_frames_enabled {
            unsafe { callback(self.0.user_data, enabled) };
        }
    }

    fn set_vsync_interval(&self, interval: Duration) {
        if let Some(callback) = self.0.set_vsync_interval {
            let micros = u64::try_from(interval.as_micros()).unwrap_or(u64::MAX);
            unsafe { callback(self.0.user_data, micros) };
        }
    }

    fn set_background_color(&self, color: Color) {
        if let Some(callback) = self.0.set_background_color {
            unsafe { callback(self.0.user_data, color.0) };
        }
    }

    fn invalidate(&self, rect: Option<Rect>) {
        if let Some(callback) = self.0.invalidate {
            let full = rect.is_none();
            let rect = rect.unwrap_or_default();
            unsafe {
                callback(
                    self.0.user_data,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    full,
                )
            };
        }
    }

    fn shutdown_widget(&self) {
        self.notify(self.0.shutdown_widget);
    }
}

/// ### English
/// Runs `op` on the host, logging and collapsing any failure to `false`.
///
/// # Safety
/// `host` must be NULL or a live `XianOffscreenHost*`.
///
/// ### 中文
/// 在 host 上执行 `op`，记录任何失败并折叠为 `false`。
///
/// # Safety
/// `host` 必须为 NULL 或存活的 `XianOffscreenHost*`。
unsafe fn with_view(
    host: *mut XianOffscreenHost,
    view: u64,
    what: &'static str,
    op: impl FnOnce(&mut OffscreenViewHost, ViewId) -> OffscreenResult<()>,
) -> bool {
    if host.is_null() {
        return false;
    }
    let host = unsafe { &mut (*host).host };
    match op(host, ViewId::from_raw(view)) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(%err, view, what, "view operation failed");
            false
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Creates a root view of `width`x`height` DIP whose frames go to the paint observer registered
/// under `observer_id`.
///
/// `frame_rate` is clamped to `1..=240`; `scale_factor = 0` follows the display. Returns an opaque
/// non-zero view id, or `0` on failure.
///
/// ### 中文
/// 创建 `width`x`height` DIP 的根 view，其帧交给以 `observer_id` 注册的 paint observer。
///
/// `frame_rate` 会被钳制到 `1..=240`；`scale_factor = 0` 表示跟随显示器。返回不透明的非零 view id，失败时返回 `0`。
pub unsafe extern "C" fn xian_offscreen_view_create(
    host: *mut XianOffscreenHost,
    observer_id: i32,
    render_host: *const XianOffscreenRenderHost,
    width: u32,
    height: u32,
    frame_rate: u32,
    scale_factor: f32,
    view_flags: u32,
) -> u64 {
    if host.is_null() || render_host.is_null() {
        return 0;
    }
    if view_flags & !KNOWN_VIEW_FLAGS != 0 {
        tracing::warn!(view_flags, "ignoring unknown view flags");
    }
    if !scale_factor.is_finite() || scale_factor < 0.0 {
        tracing::error!(scale_factor, "invalid scale factor");
        return 0;
    }

    let registry = with_state(|state| state.paint_registry.clone());
    let mut init = OffscreenViewInit::new(
        Rc::new(ForeignRenderHost(unsafe { *render_host })),
        Rc::new(ObserverFrameSink::new(registry, observer_id)),
    );
    init.size = LogicalSize::new(width, height);
    init.frame_rate = frame_rate;
    init.scale_factor = scale_factor;
    init.transparent = has_flag(view_flags, XIAN_OFFSCREEN_VIEW_FLAG_TRANSPARENT);
    init.start_hidden = has_flag(view_flags, XIAN_OFFSCREEN_VIEW_FLAG_START_HIDDEN);
    init.painting = !has_flag(view_flags, XIAN_OFFSCREEN_VIEW_FLAG_NOT_PAINTING);

    unsafe { (*host).host.create_view(init) }.to_raw()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_offscreen_view_destroy(host: *mut XianOffscreenHost, view: u64) -> bool {
    unsafe { with_view(host, view, "destroy", |host, id| host.destroy(id)) }
}

#[unsafe(no_mangle)]
/// ### English
/// Sets the view's frame rate (clamped to `1..=240`).
///
/// ### 中文
/// 设置 view 的帧率（钳制到 `1..=240`）。
pub unsafe extern "C" fn xian_offscreen_view_set_frame_rate(
    host: *mut XianOffscreenHost,
    view: u64,
    frame_rate: i32,
) -> bool {
    unsafe {
        with_view(host, view, "set_frame_rate", |host, id| {
            host.set_frame_rate(id, frame_rate)
        })
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Sets a manual scale factor; `0` switches to following the display.
///
/// ### 中文
/// 设置手动缩放因子；`0` 表示切换为跟随显示器。
pub unsafe extern "C" fn xian_offscreen_view_set_manual_scale_factor(
    host: *mut XianOffscreenHost,
    view: u64,
    scale_factor: f32,
) -> bool {
    unsafe {
        with_view(host, view, "set_manual_scale_factor", |host, id| {
            host.set_manual_scale_factor(id, scale_factor)
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_offscreen_view_set_painting(
    host: *mut XianOffscreenHost,
    view: u64,
    painting: bool,
) -> bool {
    unsafe {
        with_view(host, view, "set_painting", |host, id| {
            host.set_painting(id, painting)
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_offscreen_view_show(host: *mut XianOffscreenHost, view: u64) -> bool {
    unsafe { with_view(host, view, "show", |host, id| host.show(id)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_offscreen_view_hide(host: *mut XianOffscreenHost, view: u64) -> bool {
    unsafe { with_view(host, view, "hide", |host, id| host.hide(id)) }
}

#[unsafe(no_mangle)]
/// ### English
/// Resizes the view (DIP).
///
/// ### 中文
/// 调整 view 尺寸（DIP）。
pub unsafe extern "C" fn xian_offscreen_view_set_size(
    host: *mut XianOffscreenHost,
    view: u64,
    width: u32,
    height: u32,
) -> bool {
    unsafe {
        with_view(host, view, "set_size", |host, id| {
            host.set_size(id, LogicalSize::new(width, height))
        })
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Notifies the view that a navigation committed.
///
/// ### 中文
/// 通知 view 导航已提交。
pub unsafe extern "C" fn xian_offscreen_view_did_navigate(
    host: *mut XianOffscreenHost,
    view: u64,
) -> bool {
    unsafe { with_view(host, view, "did_navigate", |host, id| host.did_navigate(id)) }
}

#[unsafe(no_mangle)]
/// ### English
/// Delivers a software frame (BGRA, `row_bytes` per row) to the view. The pixels are copied.
///
/// ### 中文
/// 向 view 交付一帧软件位图（BGRA，每行 `row_bytes` 字节）。像素会被复制。
pub unsafe extern "C" fn xian_offscreen_view_on_paint(
    host: *mut XianOffscreenHost,
    view: u64,
    damage_x: i32,
    damage_y: i32,
    damage_width: i32,
    damage_height: i32,
    pixels: *const u8,
    width: u32,
    height: u32,
    row_bytes: u32,
) -> bool {
    let tight_row = width as usize * BYTES_PER_PIXEL;
    if pixels.is_null() || (row_bytes as usize) < tight_row {
        return false;
    }

    let src = unsafe { std::slice::from_raw_parts(pixels, row_bytes as usize * height as usize) };
    let mut packed = Vec::with_capacity(tight_row * height as usize);
    for row in src.chunks_exact(row_bytes.max(1) as usize) {
        packed.extend_from_slice(&row[..tight_row]);
    }
    let bitmap = match Bitmap::new(PhysicalSize::new(width, height), packed) {
        Ok(bitmap) => bitmap,
        Err(err) => {
            tracing::error!(%err, "invalid paint bitmap");
            return false;
        }
    };
    let damage = Rect::new(damage_x, damage_y, damage_width, damage_height);

    unsafe {
        with_view(host, view, "on_paint", |host, id| {
            host.on_paint(id, damage, bitmap)
        })
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Delivers a GPU frame to the view.
///
/// `release` (optional) is run exactly once: by the paint observer, or immediately with the empty
/// sync token when the frame cannot be delivered.
///
/// ### 中文
/// 向 view 交付一帧 GPU 帧。
///
/// `release`（可选）恰好运行一次：由 paint observer 运行，或在帧无法交付时立即以空 sync token 运行。
pub unsafe extern "C" fn xian_offscreen_view_on_texture_paint(
    host: *mut XianOffscreenHost,
    view: u64,
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
    if host.is_null() || mailbox.is_null() || sync_token.is_null() {
        release.release_unused();
        return false;
    }

    let rect = Rect::new(x, y, width, height);
    let frame = TexturePaint {
        mailbox: unsafe { *mailbox },
        sync_token: unsafe { *sync_token },
        content_rect: rect,
        damage_rect: rect,
        is_popup: false,
        release,
    };
    unsafe {
        with_view(host, view, "on_texture_paint", |host, id| {
            host.on_texture_paint(id, frame)
        })
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Notifies the view that the embedder recreated its backing texture (forces a burst of redraws).
///
/// ### 中文
/// 通知 view 宿主已重新创建其后备纹理（强制一轮重绘）。
pub unsafe extern "C" fn xian_offscreen_view_on_backing_texture_created(
    host: *mut XianOffscreenHost,
    view: u64,
) -> bool {
    unsafe {
        with_view(host, view, "on_backing_texture_created", |host, id| {
            host.on_backing_texture_created(id)
        })
    }
}
