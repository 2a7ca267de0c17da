//! ### English
//! Per-thread "current producer context", the equivalent of an EGL thread state.
//!
//! Fence sets bind to whatever context is current on the creating thread.
//!
//! ### 中文
//! 每线程的“当前生产者上下文”，相当于 EGL 的线程状态。
//!
//! fence set 会绑定到创建线程上当前的上下文。
use std::cell::RefCell;
use std::rc::Rc;

use super::context::ProducerContext;

thread_local! {
    static CURRENT_CONTEXT: RefCell<Option<Rc<dyn ProducerContext>>> = const { RefCell::new(None) };
}

/// ### English
/// Makes `context` current on the calling thread, returning the previously current one.
///
/// ### 中文
/// 使 `context` 在调用线程上成为 current，并返回之前的 current 上下文。
pub fn make_current(context: Rc<dyn ProducerContext>) -> Option<Rc<dyn ProducerContext>> {
    CURRENT_CONTEXT.with(|current| current.borrow_mut().replace(context))
}

/// ### English
/// Clears the calling thread's current context.
///
/// ### 中文
/// 清除调用线程的 current 上下文。
pub fn release_current() -> Option<Rc<dyn ProducerContext>> {
    CURRENT_CONTEXT.with(|current| current.borrow_mut().take())
}

pub fn current_context() -> Option<Rc<dyn ProducerContext>> {
    CURRENT_CONTEXT.with(|current| current.borrow().clone())
}

/// ### English
/// Returns whether `context` is the calling thread's current context.
///
/// ### 中文
/// 判断 `context` 是否为调用线程的 current 上下文。
pub fn is_current(context: &Rc<dyn ProducerContext>) -> bool {
    CURRENT_CONTEXT.with(|current| {
        current
            .borrow()
            .as_ref()
            .is_some_and(|c| Rc::ptr_eq(c, context))
    })
}
