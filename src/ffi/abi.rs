//! ### English
//! ABI version, constant getters and frame release.
//!
//! ### 中文
//! ABI 版本、常量获取函数与帧释放。

use std::ffi::c_void;

use super::ReleaseContext;
use crate::engine::flags;
use crate::engine::gpu::{DeviceType, SyncToken};

#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version.
///
/// ### 中文
/// 返回 C ABI 版本号。
pub extern "C" fn xian_offscreen_abi_version() -> u32 {
    super::XIAN_OFFSCREEN_ABI_VERSION
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `XIAN_OFFSCREEN_VIEW_FLAG_TRANSPARENT`.
/// (Panama-friendly constant getter; avoids relying on C headers.)
///
/// ### 中文
/// 返回 `XIAN_OFFSCREEN_VIEW_FLAG_TRANSPARENT`。
/// （Panama 友好的常量获取函数；避免依赖 C 头文件。）
pub extern "C" fn xian_offscreen_view_flag_transparent() -> u32 {
    flags::XIAN_OFFSCREEN_VIEW_FLAG_TRANSPARENT
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_offscreen_view_flag_start_hidden() -> u32 {
    flags::XIAN_OFFSCREEN_VIEW_FLAG_START_HIDDEN
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_offscreen_view_flag_not_painting() -> u32 {
    flags::XIAN_OFFSCREEN_VIEW_FLAG_NOT_PAINTING
}

#[unsafe(no_mangle)]
/// ### English
/// Returns the device type value for a GL secondary device.
///
/// ### 中文
/// 返回 GL 第二设备的设备类型值。
pub extern "C" fn xian_offscreen_fence_set_device_type_gl() -> u32 {
    DeviceType::Gl as u32
}

#[unsafe(no_mangle)]
/// ### English
/// Returns the device type value for a D3D11 secondary device.
///
/// ### 中文
/// 返回 D3D11 第二设备的设备类型值。
pub extern "C" fn xian_offscreen_fence_set_device_type_d3d11() -> u32 {
    DeviceType::D3D11 as u32
}

#[unsafe(no_mangle)]
/// ### English
/// Releases a frame previously handed to the embedder.
///
/// This is the `release_callback` passed with every texture frame; call it exactly once with the
/// frame's `release_context`. `sync_token` may be NULL when the consumer has no GPU work to wait
/// for. Calling it twice with the same context is undefined behavior.
///
/// ### 中文
/// 释放之前交给宿主的帧。
///
/// 这就是每个纹理帧附带的 `release_callback`；请以该帧的 `release_context` 调用且仅调用一次。
/// 若消费者没有需要等待的 GPU 工作，`sync_token` 可为 NULL。对同一 context 调用两次属于未定义行为。
pub unsafe extern "C" fn xian_offscreen_release_frame(
    release_context: *mut c_void,
    sync_token: *const SyncToken,
) {
    if release_context.is_null() {
        return;
    }
    let release = unsafe { Box::from_raw(release_context.cast::<ReleaseContext>()) };
    let sync_token = if sync_token.is_null() {
        SyncToken::default()
    } else {
        unsafe { *sync_token }
    };
    release.0.run(sync_token);
}
