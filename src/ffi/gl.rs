//! ### English
//! C ABI bindings for GL producer contexts.
//!
//! ### 中文
//! GL 生产者上下文的 C ABI 绑定。

use std::ffi::{CString, c_char, c_void};
use std::rc::Rc;
use std::sync::Arc;

use crate::engine::gpu::{
    GlActivation, GlProducerContext, GlProducerContextInit, GlSecondaryDevice, ProducerContext,
    current,
};

/// ### English
/// Resolves a GL entry point by name, e.g. `glfwGetProcAddress` wrapped with `user_data`.
///
/// ### 中文
/// 按名称解析 GL 入口点，例如包装了 `user_data` 的 `glfwGetProcAddress`。
pub type XianOffscreenGlLoaderFn =
    unsafe extern "C" fn(user_data: *mut c_void, name: *const c_char) -> *const c_void;

/// ### English
/// Makes the embedder's GL context current on the calling thread; returns `false` on failure.
///
/// ### 中文
/// 使宿主的 GL 上下文在调用线程上成为 current；失败时返回 `false`。
pub type XianOffscreenGlMakeCurrentFn = unsafe extern "C" fn(user_data: *mut c_void) -> bool;

/// ### English
/// Opaque GL context handle: one embedder GL context, usable as a producer context and as a
/// fence-set secondary device.
///
/// ### 中文
/// 不透明 GL 上下文句柄：对应宿主的一个 GL 上下文，可作为生产者上下文，也可作为 fence set 的第二设备。
pub struct XianOffscreenGlContext {
    producer: Rc<dyn ProducerContext>,
    glow: Arc<glow::Context>,
    make_current: Option<XianOffscreenGlMakeCurrentFn>,
    user_data: *mut c_void,
}

impl XianOffscreenGlContext {
    pub(super) fn secondary_device(&self) -> GlSecondaryDevice {
        GlSecondaryDevice::new(self.glow.clone(), activation(self.make_current, self.user_data))
    }
}

fn activation(
    make_current: Option<XianOffscreenGlMakeCurrentFn>,
    user_data: *mut c_void,
) -> Option<GlActivation> {
    let make_current = make_current?;
    Some(Box::new(move || unsafe { make_current(user_data) }))
}

#[unsafe(no_mangle)]
/// ### English
/// Wraps the embedder's GL context.
///
/// `loader` resolves GL functions and must be called with the context current. `make_current`
/// is optional; when given, it is invoked before every GL command this context issues.
///
/// ### 中文
/// 包装宿主的 GL 上下文。
///
/// `loader` 用于解析 GL 函数，调用时该上下文必须为 current。`make_current` 可选；若提供，会在该上下文
/// 发出每条 GL 命令前调用。
pub unsafe extern "C" fn xian_offscreen_gl_context_create(
    loader: Option<XianOffscreenGlLoaderFn>,
    make_current: Option<XianOffscreenGlMakeCurrentFn>,
    user_data: *mut c_void,
) -> *mut XianOffscreenGlContext {
    let Some(loader) = loader else {
        return std::ptr::null_mut();
    };

    let glow = unsafe {
        glow::Context::from_loader_function(|name| {
            CString::new(name).map_or(std::ptr::null(), |name| loader(user_data, name.as_ptr()))
        })
    };
    let glow = Arc::new(glow);

    let producer = Rc::new(GlProducerContext::new(GlProducerContextInit {
        glow: glow.clone(),
        activation: activation(make_current, user_data),
    }));

    Box::into_raw(Box::new(XianOffscreenGlContext {
        producer,
        glow,
        make_current,
        user_data,
    }))
}

#[unsafe(no_mangle)]
/// ### English
/// Makes the context the calling thread's current producer context (used by fence sets and
/// mailbox creation).
///
/// ### 中文
/// 使该上下文成为调用线程当前的生产者上下文（供 fence set 与 mailbox 创建使用）。
pub unsafe extern "C" fn xian_offscreen_gl_context_make_current(
    context: *mut XianOffscreenGlContext,
) -> bool {
    if context.is_null() {
        return false;
    }
    current::make_current(unsafe { (*context).producer.clone() });
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Clears the calling thread's current producer context.
///
/// ### 中文
/// 清除调用线程当前的生产者上下文。
pub extern "C" fn xian_offscreen_gl_context_release_current() {
    current::release_current();
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a context created by `xian_offscreen_gl_context_create`.
///
/// Fence sets created while it was current stay valid handles, but inserting dependencies into
/// them fails from now on.
///
/// ### 中文
/// 销毁由 `xian_offscreen_gl_context_create` 创建的上下文。
///
/// 在其为 current 时创建的 fence set 句柄仍然有效，但此后向其插入依赖会失败。
pub unsafe extern "C" fn xian_offscreen_gl_context_destroy(context: *mut XianOffscreenGlContext) {
    if context.is_null() {
        return;
    }
    let context = unsafe { Box::from_raw(context) };
    if current::is_current(&context.producer) {
        current::release_current();
    }
}
