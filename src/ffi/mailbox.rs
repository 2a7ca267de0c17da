//! ### English
//! C ABI bindings for mailboxes backed by externally shared GPU memory.
//!
//! ### 中文
//! 由外部共享 GPU 内存支撑的 mailbox 的 C ABI 绑定。

use dpi::PhysicalSize;

use crate::engine::gpu::{Mailbox, current};

#[unsafe(no_mangle)]
/// ### English
/// Registers a shared GPU image with the current producer context and writes its mailbox to
/// `out_mailbox`.
///
/// For GL contexts `shared_handle` is a texture name visible to the producer context.
///
/// ### 中文
/// 向当前生产者上下文注册共享 GPU 图像，并把其 mailbox 写入 `out_mailbox`。
///
/// 对 GL 上下文而言，`shared_handle` 是生产者上下文可见的纹理名称。
pub unsafe extern "C" fn xian_offscreen_create_mailbox_from_shared_handle(
    shared_handle: u64,
    width: u32,
    height: u32,
    out_mailbox: *mut Mailbox,
) -> bool {
    if out_mailbox.is_null() {
        return false;
    }
    let Some(context) = current::current_context() else {
        tracing::error!("no current producer context for mailbox creation");
        return false;
    };

    match context.create_shared_image(shared_handle, PhysicalSize::new(width, height)) {
        Ok(mailbox) => {
            unsafe { *out_mailbox = mailbox };
            true
        }
        Err(err) => {
            tracing::error!(%err, "failed to create mailbox");
            false
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Unregisters a mailbox created by `xian_offscreen_create_mailbox_from_shared_handle`.
///
/// ### 中文
/// 注销由 `xian_offscreen_create_mailbox_from_shared_handle` 创建的 mailbox。
pub unsafe extern "C" fn xian_offscreen_release_mailbox(mailbox: *const Mailbox) -> bool {
    if mailbox.is_null() {
        return false;
    }
    let Some(context) = current::current_context() else {
        tracing::error!("no current producer context for mailbox release");
        return false;
    };

    match context.delete_shared_image(unsafe { &*mailbox }) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(%err, "failed to release mailbox");
            false
        }
    }
}
