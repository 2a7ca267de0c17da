//! ### English
//! C ABI bindings for fence sets.
//!
//! ### 中文
//! fence set 的 C ABI 绑定。

use std::ffi::c_void;

use super::gl::XianOffscreenGlContext;
use super::with_state;
use crate::engine::gpu::{
    DeviceType, FenceSetCreateInfo, FenceSetHandle, SecondaryDevice, UnsupportedDevice,
};

#[repr(C)]
/// ### English
/// Platform device descriptor for `xian_offscreen_create_fence_set`.
///
/// ### 中文
/// `xian_offscreen_create_fence_set` 使用的平台设备描述。
pub struct XianOffscreenFenceSetDevice {
    /// ### English
    /// `xian_offscreen_fence_set_device_type_gl()` or `..._d3d11()`.
    ///
    /// ### 中文
    /// `xian_offscreen_fence_set_device_type_gl()` 或 `..._d3d11()`。
    pub device_type: u32,
    /// ### English
    /// GL: a `XianOffscreenGlContext*` sharing objects with the producer.
    /// D3D11: an `ID3D11Device*`.
    ///
    /// ### 中文
    /// GL：与生产者共享对象的 `XianOffscreenGlContext*`。
    /// D3D11：`ID3D11Device*`。
    pub device: *mut c_void,
}

/// ### English
/// Builds the secondary device a descriptor names, or `None` if it cannot be used.
///
/// # Safety
/// A GL descriptor's `device` must be a live `XianOffscreenGlContext*`.
///
/// ### 中文
/// 构建描述所指定的第二设备；无法使用时返回 `None`。
///
/// # Safety
/// GL 描述的 `device` 必须是存活的 `XianOffscreenGlContext*`。
unsafe fn secondary_device(
    descriptor: &XianOffscreenFenceSetDevice,
) -> Option<Box<dyn SecondaryDevice>> {
    if descriptor.device.is_null() {
        tracing::error!("fence set device is NULL");
        return None;
    }
    match DeviceType::from_raw(descriptor.device_type) {
        Some(DeviceType::Gl) => {
            let context = unsafe { &*descriptor.device.cast::<XianOffscreenGlContext>() };
            Some(Box::new(context.secondary_device()))
        }
        Some(DeviceType::D3D11) => Some(Box::new(UnsupportedDevice::new(DeviceType::D3D11))),
        None => {
            tracing::error!(device_type = descriptor.device_type, "unknown fence set device type");
            None
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Creates a fence set of `num_fences` slots on the calling thread's current producer context.
///
/// Returns an opaque non-zero handle, or `0` on failure (zero fences, NULL or unknown device, no
/// current context).
///
/// ### 中文
/// 在调用线程当前的生产者上下文上创建含 `num_fences` 个槽位的 fence set。
///
/// 返回不透明的非零句柄；失败（fence 数为零、设备为 NULL 或未知、没有 current 上下文）时返回 `0`。
pub unsafe extern "C" fn xian_offscreen_create_fence_set(
    num_fences: u32,
    device: *const XianOffscreenFenceSetDevice,
) -> u64 {
    let device = if device.is_null() {
        None
    } else {
        unsafe { secondary_device(&*device) }
    };
    let info = FenceSetCreateInfo {
        num_fences: num_fences as usize,
        device,
    };

    match with_state(|state| state.fence_sets.create(info)) {
        Ok(handle) => handle.to_raw(),
        Err(err) => {
            tracing::error!(%err, "failed to create fence set");
            0
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Inserts one GPU dependency into the fence set's ring. Returns `false` on failure.
///
/// Keep at most `num_fences - 1` dependencies in flight: the oldest one is silently replaced.
///
/// ### 中文
/// 向 fence set 的 ring 插入一个 GPU 依赖。失败时返回 `false`。
///
/// 同时在途的依赖至多为 `num_fences - 1` 个：最旧的依赖会被静默替换。
pub extern "C" fn xian_offscreen_insert_dependency(fence_set: u64) -> bool {
    let handle = FenceSetHandle::from_raw(fence_set);
    match with_state(|state| state.fence_sets.insert_dependency(handle)) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(%err, fence_set, "failed to insert dependency");
            false
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a fence set. Succeeds exactly once per handle.
///
/// ### 中文
/// 销毁 fence set。每个句柄仅能成功一次。
pub extern "C" fn xian_offscreen_destroy_fence_set(fence_set: u64) -> bool {
    let handle = FenceSetHandle::from_raw(fence_set);
    match with_state(|state| state.fence_sets.destroy(handle)) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(%err, fence_set, "failed to destroy fence set");
            false
        }
    }
}
