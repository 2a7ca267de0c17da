//! ### English
//! OpenGL implementations of the producer context and the secondary device, using `glow`.
//!
//! glow calls go to whichever GL context is current on the calling thread. Both types accept an
//! optional activation hook that makes their context current before issuing GL commands.
//!
//! ### 中文
//! 基于 `glow` 的 OpenGL 生产者上下文与第二设备实现。
//!
//! glow 调用作用于调用线程上 current 的 GL 上下文。两种类型都可接收一个激活钩子，在发出 GL 命令前使其上下文成为 current。

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use dpi::PhysicalSize;
use glow::HasContext as _;

use super::context::{FenceId, GpuFence, PendingFence, ProducerContext};
use super::device_wait::{DeviceType, ImportedFence, SecondaryDevice};
use super::mailbox::{MAILBOX_NAME_LEN, Mailbox};
use crate::engine::error::{OffscreenError, OffscreenResult};

/// ### English
/// `GL_TIMEOUT_IGNORED`: the only timeout `glWaitSync` accepts.
///
/// ### 中文
/// `GL_TIMEOUT_IGNORED`：`glWaitSync` 唯一接受的超时值。
const GL_TIMEOUT_IGNORED: u64 = u64::MAX;

/// ### English
/// Makes a GL context current; returns `false` if that failed.
///
/// ### 中文
/// 使某个 GL 上下文成为 current；失败时返回 `false`。
pub type GlActivation = Box<dyn Fn() -> bool>;

#[inline]
fn native_fence(fence: &GpuFence) -> glow::NativeFence {
    glow::NativeFence(fence.raw() as usize as *mut _)
}

fn activate(hook: Option<&GlActivation>) -> bool {
    hook.is_none_or(|make_current| make_current())
}

/// ### English
/// Producer context backed by a GL context.
///
/// Fences are `GLsync` objects inserted with `glFenceSync` and flushed so another context can
/// wait on them. Shared images are GL textures (names owned by a sharing context) registered
/// under generated mailboxes.
///
/// ### 中文
/// 基于 GL 上下文的生产者上下文。
///
/// fence 为 `glFenceSync` 插入的 `GLsync` 对象，并会 flush 以便其他上下文等待。共享图像是已注册的 GL 纹理
/// （名称由共享上下文持有），以生成的 mailbox 命名。
pub struct GlProducerContext {
    glow: Arc<glow::Context>,
    activation: Option<GlActivation>,
    next_fence_id: Cell<u32>,
    live_fences: RefCell<BTreeMap<FenceId, GpuFence>>,
    next_mailbox: Cell<u64>,
    shared_images: RefCell<BTreeMap<Mailbox, (glow::NativeTexture, PhysicalSize<u32>)>>,
}

/// ### English
/// Construction parameters for [`GlProducerContext`].
///
/// ### 中文
/// [`GlProducerContext`] 的构造参数。
pub struct GlProducerContextInit {
    pub glow: Arc<glow::Context>,
    pub activation: Option<GlActivation>,
}

impl GlProducerContext {
    pub fn new(init: GlProducerContextInit) -> Self {
        let GlProducerContextInit { glow, activation } = init;
        Self {
            glow,
            activation,
            next_fence_id: Cell::new(1),
            live_fences: RefCell::new(BTreeMap::new()),
            next_mailbox: Cell::new(1),
            shared_images: RefCell::new(BTreeMap::new()),
        }
    }

    /// ### English
    /// Looks up the GL texture behind a mailbox created by this context.
    ///
    /// ### 中文
    /// 查找由本上下文创建的 mailbox 所对应的 GL 纹理。
    pub fn texture_for(&self, mailbox: &Mailbox) -> Option<(glow::NativeTexture, PhysicalSize<u32>)> {
        self.shared_images.borrow().get(mailbox).copied()
    }

    pub fn live_fence_count(&self) -> usize {
        self.live_fences.borrow().len()
    }

    fn allocate_fence_id(&self) -> FenceId {
        let id = self.next_fence_id.get();
        self.next_fence_id.set(id.wrapping_add(1).max(1));
        FenceId(id)
    }

    fn allocate_mailbox(&self) -> Mailbox {
        let serial = self.next_mailbox.get();
        self.next_mailbox.set(serial.wrapping_add(1).max(1));

        let context_tag = Arc::as_ptr(&self.glow) as usize as u64;
        let mut name = [0u8; MAILBOX_NAME_LEN];
        name[..8].copy_from_slice(&context_tag.to_le_bytes());
        name[8..].copy_from_slice(&serial.to_le_bytes());
        Mailbox::from_name_bytes(name, true)
    }
}

impl ProducerContext for GlProducerContext {
    fn create_gpu_fence(&self) -> OffscreenResult<PendingFence> {
        if !activate(self.activation.as_ref()) {
            return Err(OffscreenError::fence_creation(
                "unable to make producer GL context current",
            ));
        }

        let sync = unsafe { self.glow.fence_sync(glow::SYNC_GPU_COMMANDS_COMPLETE, 0) }
            .map_err(OffscreenError::fence_creation)?;
        unsafe {
            self.glow.flush();
        }

        let fence = GpuFence::from_raw(sync.0 as usize as u64);
        let id = self.allocate_fence_id();
        self.live_fences.borrow_mut().insert(id, fence);
        tracing::trace!(fence_id = id.0, "created GL fence");
        Ok(PendingFence::ready(id, fence))
    }

    fn destroy_gpu_fence(&self, id: FenceId, fence: GpuFence) {
        if self.live_fences.borrow_mut().remove(&id).is_none() {
            tracing::warn!(fence_id = id.0, "destroying unknown GL fence");
            return;
        }
        if !activate(self.activation.as_ref()) {
            tracing::warn!(fence_id = id.0, "producer GL context unavailable; leaking fence");
            return;
        }
        unsafe {
            self.glow.delete_sync(native_fence(&fence));
        }
    }

    fn create_shared_image(
        &self,
        shared_handle: u64,
        size: PhysicalSize<u32>,
    ) -> OffscreenResult<Mailbox> {
        if size.width == 0 || size.height == 0 {
            return Err(OffscreenError::invalid_argument(format!(
                "shared image size {}x{} is empty",
                size.width, size.height
            )));
        }
        let texture_name = u32::try_from(shared_handle)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| {
                OffscreenError::invalid_argument(format!(
                    "{shared_handle:#x} is not a GL texture name"
                ))
            })?;

        let mailbox = self.allocate_mailbox();
        self.shared_images
            .borrow_mut()
            .insert(mailbox, (glow::NativeTexture(texture_name), size));
        tracing::debug!(?mailbox, texture = texture_name.get(), "registered shared image");
        Ok(mailbox)
    }

    fn delete_shared_image(&self, mailbox: &Mailbox) -> OffscreenResult<()> {
        match self.shared_images.borrow_mut().remove(mailbox) {
            Some(_) => Ok(()),
            None => Err(OffscreenError::not_found(format!("{mailbox:?}"))),
        }
    }
}

impl Drop for GlProducerContext {
    fn drop(&mut self) {
        let fences = std::mem::take(self.live_fences.get_mut());
        if fences.is_empty() || !activate(self.activation.as_ref()) {
            return;
        }
        for fence in fences.values() {
            unsafe {
                self.glow.delete_sync(native_fence(fence));
            }
        }
    }
}

/// ### English
/// Secondary device backed by another GL context that shares objects with the producer.
///
/// The wait is `glWaitSync(.., GL_TIMEOUT_IGNORED)`: the server-side queue stalls, the CPU does not.
/// Nothing is imported, so the returned [`ImportedFence`] retains nothing.
///
/// ### 中文
/// 由另一个与生产者共享对象的 GL 上下文实现的第二设备。
///
/// 等待方式为 `glWaitSync(.., GL_TIMEOUT_IGNORED)`：阻塞的是 GPU 服务器端队列而非 CPU。
/// 不需要导入任何对象，因此返回的 [`ImportedFence`] 不保留任何内容。
pub struct GlSecondaryDevice {
    glow: Arc<glow::Context>,
    activation: Option<GlActivation>,
}

impl GlSecondaryDevice {
    pub fn new(glow: Arc<glow::Context>, activation: Option<GlActivation>) -> Self {
        Self { glow, activation }
    }
}

impl SecondaryDevice for GlSecondaryDevice {
    fn device_type(&self) -> DeviceType {
        DeviceType::Gl
    }

    fn wait(&self, fence: &GpuFence) -> OffscreenResult<ImportedFence> {
        if fence.raw() == 0 {
            return Err(OffscreenError::device_wait("null GL sync object"));
        }
        if !activate(self.activation.as_ref()) {
            return Err(OffscreenError::device_wait(
                "unable to make secondary GL context current",
            ));
        }

        let error = unsafe {
            self.glow.wait_sync(native_fence(fence), 0, GL_TIMEOUT_IGNORED);
            self.glow.flush();
            self.glow.get_error()
        };
        if error != glow::NO_ERROR {
            tracing::error!(gl_error = error, "glWaitSync failed");
            return Err(OffscreenError::device_wait(format!(
                "glWaitSync raised GL error {error:#x}"
            )));
        }
        Ok(ImportedFence::none())
    }
}
