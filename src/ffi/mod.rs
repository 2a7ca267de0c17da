//! ### English
//! C ABI surface for `xian_offscreen`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`.
//! Every failure is logged and collapsed to `false`, `0` or NULL at this boundary.
//!
//! Process-wide ABI state (the fence-set pool and the observer registries) is thread-local: call
//! every function from the one thread that owns the GPU context and the views.
//! Strings must be NUL-terminated UTF-8.
//!
//! ### 中文
//! `xian_offscreen` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。
//! 所有失败都会记录日志，并在此边界折叠为 `false`、`0` 或 NULL。
//!
//! 进程级 ABI 状态（fence set 池与 observer 注册表）为线程局部：请在持有 GPU 上下文与 view 的同一线程上
//! 调用所有函数。字符串必须是以 NUL 结尾的 UTF-8。
mod abi;
mod canvas;
mod fence;
mod gl;
mod host;
mod mailbox;
mod paint;
mod view;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::{CStr, c_char, c_void};
use std::rc::Rc;
use std::sync::Arc;

use crate::engine::canvas::CanvasObserverRegistry;
use crate::engine::gpu::{FenceSetPool, ReleaseCallback, SyncToken};
use crate::engine::paint::PaintObserverRegistry;

/// ### English
/// C ABI version for `xian_offscreen`.
///
/// ### 中文
/// `xian_offscreen` 的 C ABI 版本号。
const XIAN_OFFSCREEN_ABI_VERSION: u32 = 1;

/// ### English
/// Release half of a frame handed to the embedder. Call it exactly once with `release_context`
/// and the sync token after which the image may be recycled (NULL means "no wait").
///
/// ### 中文
/// 交给宿主的帧的释放函数。必须以 `release_context` 与“此后图像可被回收”的 sync token 调用且仅调用一次
/// （NULL 表示无需等待）。
pub type XianOffscreenReleaseFn =
    unsafe extern "C" fn(release_context: *mut c_void, sync_token: *const SyncToken);

/// ### English
/// Thread-local ABI state: explicit services, owned here instead of as free globals.
///
/// Observer registries hold weak references, so the strong references registered through the
/// ABI are kept alive in this table until removed.
///
/// ### 中文
/// 线程局部的 ABI 状态：显式的服务对象，由此处持有，而非散落的全局变量。
///
/// observer 注册表只持有弱引用，因此通过 ABI 注册的强引用保存在此表中，直到被移除。
struct AbiState {
    fence_sets: FenceSetPool,
    canvas_registry: Arc<CanvasObserverRegistry>,
    canvas_observers: BTreeMap<String, Arc<canvas::ForeignCanvasObserver>>,
    paint_registry: Rc<PaintObserverRegistry>,
    paint_observers: BTreeMap<i32, Rc<paint::ForeignPaintObserver>>,
}

impl Default for AbiState {
    fn default() -> Self {
        Self {
            fence_sets: FenceSetPool::new(),
            canvas_registry: Arc::new(CanvasObserverRegistry::new()),
            canvas_observers: BTreeMap::new(),
            paint_registry: Rc::new(PaintObserverRegistry::new()),
            paint_observers: BTreeMap::new(),
        }
    }
}

thread_local! {
    static ABI_STATE: RefCell<AbiState> = RefCell::new(AbiState::default());
}

/// ### English
/// Runs `f` with the calling thread's ABI state.
///
/// `f` must not call back into the ABI; frame callbacks therefore run outside of it.
///
/// ### 中文
/// 以调用线程的 ABI 状态执行 `f`。
///
/// `f` 不得重入 ABI；因此帧回调都在其外部执行。
fn with_state<R>(f: impl FnOnce(&mut AbiState) -> R) -> R {
    ABI_STATE.with(|state| f(&mut state.borrow_mut()))
}

/// ### English
/// Boxed release handed across the ABI as `release_context`.
///
/// ### 中文
/// 以 `release_context` 形式跨越 ABI 传递的装箱释放对象。
struct ReleaseContext(ReleaseCallback);

/// ### English
/// Splits a [`ReleaseCallback`] into the `(fn, context)` pair the embedder calls exactly once.
///
/// ### 中文
/// 把 [`ReleaseCallback`] 拆分为宿主需调用且仅调用一次的 `(fn, context)` 对。
fn into_release_pair(release: ReleaseCallback) -> (XianOffscreenReleaseFn, *mut c_void) {
    let context = Box::into_raw(Box::new(ReleaseContext(release)));
    (abi::xian_offscreen_release_frame, context.cast())
}

/// ### English
/// An embedder-provided `(fn, context)` release, wrapped so it can become a [`ReleaseCallback`].
///
/// ### 中文
/// 宿主提供的 `(fn, context)` 释放函数，经包装后可转换为 [`ReleaseCallback`]。
struct ForeignRelease {
    release: XianOffscreenReleaseFn,
    context: *mut c_void,
}

// SAFETY: the embedder promises its release function may run on any thread with its context.
unsafe impl Send for ForeignRelease {}

impl ForeignRelease {
    fn into_callback(self) -> ReleaseCallback {
        ReleaseCallback::new(move |sync_token: SyncToken| self.call(sync_token))
    }

    fn call(self, sync_token: SyncToken) {
        unsafe { (self.release)(self.context, &sync_token) };
    }
}

/// ### English
/// Converts an optional embedder release into a [`ReleaseCallback`]; NULL means nothing to
/// release.
///
/// ### 中文
/// 把可选的宿主释放函数转换为 [`ReleaseCallback`]；NULL 表示无需释放。
fn foreign_release(
    release: Option<XianOffscreenReleaseFn>,
    context: *mut c_void,
) -> ReleaseCallback {
    match release {
        Some(release) => ForeignRelease { release, context }.into_callback(),
        None => ReleaseCallback::noop(),
    }
}

/// ### English
/// Converts a NUL-terminated UTF-8 C string into `&str`.
///
/// Returns `None` for NULL pointers, invalid UTF-8, or empty strings.
///
/// # Safety
/// `ptr` must be valid and point to a NUL-terminated string for the duration of the call.
///
/// ### 中文
/// 将 NUL 结尾的 UTF-8 C 字符串转换为 `&str`。
///
/// 对 NULL 指针、UTF-8 非法或空字符串返回 `None`。
///
/// # Safety
/// `ptr` 在本次调用期间必须有效，并指向以 NUL 结尾的字符串。
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }

    let value = unsafe { CStr::from_ptr(ptr) }.to_str().ok()?;
    if value.is_empty() {
        return None;
    }

    Some(value)
}
