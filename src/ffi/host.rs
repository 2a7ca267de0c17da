//! ### English
//! C ABI bindings for the view host lifecycle.
//!
//! ### 中文
//! view host 生命周期的 C ABI 绑定。

use std::time::Instant;

use crate::engine::offscreen::OffscreenViewHost;

/// ### English
/// Opaque view host handle. Owns every view created through it; use it from one thread only.
///
/// ### 中文
/// 不透明 view host 句柄。持有通过它创建的所有 view；只能在单一线程上使用。
pub struct XianOffscreenHost {
    pub(super) host: OffscreenViewHost,
}

#[unsafe(no_mangle)]
/// ### English
/// Creates an empty view host.
///
/// ### 中文
/// 创建空的 view host。
pub extern "C" fn xian_offscreen_host_create() -> *mut XianOffscreenHost {
    Box::into_raw(Box::new(XianOffscreenHost {
        host: OffscreenViewHost::new(),
    }))
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a host created by `xian_offscreen_host_create`, together with all of its views.
///
/// ### 中文
/// 销毁由 `xian_offscreen_host_create` 创建的 host 及其所有 view。
pub unsafe extern "C" fn xian_offscreen_host_destroy(host: *mut XianOffscreenHost) {
    if host.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(host));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Runs posted tasks that are due (trailing resizes, popup cancellation, forced redraws).
/// Call it once per embedder frame. Returns the number of tasks run.
///
/// ### 中文
/// 执行已到期的投递任务（尾随 resize、取消 popup、强制重绘）。每个宿主帧调用一次。返回执行的任务数量。
pub unsafe extern "C" fn xian_offscreen_host_run_tasks(host: *mut XianOffscreenHost) -> u32 {
    if host.is_null() {
        return 0;
    }
    let ran = unsafe { (*host).host.run_pending_tasks(Instant::now()) };
    u32::try_from(ran).unwrap_or(u32::MAX)
}

#[unsafe(no_mangle)]
/// ### English
/// Sets the display's device scale factor used by views in automatic scale mode.
///
/// ### 中文
/// 设置自动缩放模式的 view 所使用的显示器设备缩放因子。
pub unsafe extern "C" fn xian_offscreen_host_set_display_scale_factor(
    host: *mut XianOffscreenHost,
    scale_factor: f32,
) -> bool {
    if host.is_null() {
        return false;
    }
    match unsafe { (*host).host.set_display_scale_factor(scale_factor) } {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(%err, "failed to set display scale factor");
            false
        }
    }
}
