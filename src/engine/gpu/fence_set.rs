use std::rc::{Rc, Weak};

use super::context::{FENCE_CREATION_TIMEOUT, FenceId, GpuFence, ProducerContext};
use super::device_wait::{ImportedFence, SecondaryDevice};
use crate::engine::error::{OffscreenError, OffscreenResult};

/// ### English
/// One ring slot: at most one live producer fence plus the secondary-device object that imported it.
///
/// ### 中文
/// 一个 ring 槽位：至多一个存活的生产者 fence，以及导入它的第二设备对象。
#[derive(Default)]
struct FenceSlot {
    fence: Option<(FenceId, GpuFence)>,
    imported: Option<ImportedFence>,
}

/// ### English
/// A fixed-size ring of GPU fences bound to one producer context and one secondary device.
///
/// The context is referenced weakly: it must outlive the set, and a set whose context is gone can
/// only be destroyed.
///
/// ### 中文
/// 绑定到一个生产者上下文与一个第二设备的固定大小 GPU fence 环。
///
/// 对上下文仅持弱引用：上下文必须比 set 活得久；若上下文已销毁，该 set 只能被销毁。
pub(super) struct FenceSet {
    context: Weak<dyn ProducerContext>,
    device: Box<dyn SecondaryDevice>,
    slots: Box<[FenceSlot]>,
    idx_cur_fence: usize,
}

impl FenceSet {
    /// ### English
    /// Creates an empty ring. `num_fences` must be non-zero (checked by the pool).
    ///
    /// ### 中文
    /// 创建空 ring。`num_fences` 必须非零（由 pool 检查）。
    pub(super) fn new(
        num_fences: usize,
        context: &Rc<dyn ProducerContext>,
        device: Box<dyn SecondaryDevice>,
    ) -> Self {
        debug_assert!(num_fences > 0);
        let slots = (0..num_fences).map(|_| FenceSlot::default()).collect();
        Self {
            context: Rc::downgrade(context),
            device,
            slots,
            idx_cur_fence: 0,
        }
    }

    pub(super) fn num_fences(&self) -> usize {
        self.slots.len()
    }

    pub(super) fn cursor(&self) -> usize {
        self.idx_cur_fence
    }

    pub(super) fn is_slot_live(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|s| s.fence.is_some())
    }

    /// ### English
    /// Advances the ring, retires the slot's previous fence, then creates a new fence and makes the
    /// secondary device wait on it.
    ///
    /// The cursor advances even when creation or the wait fails, so the next call moves on to the
    /// following slot.
    ///
    /// ### 中文
    /// 推进 ring，回收该槽位之前的 fence，然后创建新 fence 并让第二设备等待它。
    ///
    /// 即使创建或等待失败，游标也会前进，下一次调用会使用后一个槽位。
    pub(super) fn insert_dependency(&mut self) -> OffscreenResult<usize> {
        let context = self
            .context
            .upgrade()
            .ok_or_else(|| OffscreenError::fence_creation("owning GPU context was destroyed"))?;

        let idx_fence = self.idx_cur_fence;
        self.idx_cur_fence = (self.idx_cur_fence + 1) % self.slots.len();

        let slot = &mut self.slots[idx_fence];
        if let Some((id, fence)) = slot.fence.take() {
            slot.imported = None;
            tracing::trace!(slot = idx_fence, fence_id = id.0, "retiring fence");
            context.destroy_gpu_fence(id, fence);
        }

        let pending = context.create_gpu_fence()?;
        let id = pending.id();
        let fence = pending.wait(FENCE_CREATION_TIMEOUT)?;
        slot.fence = Some((id, fence));

        let imported = self.device.wait(&fence).inspect_err(|err| {
            tracing::error!(slot = idx_fence, fence_id = id.0, %err, "device wait failed");
        })?;
        slot.imported = Some(imported);
        Ok(idx_fence)
    }

    /// ### English
    /// Drops every imported object, then destroys every live fence on the owning context.
    ///
    /// ### 中文
    /// 先释放所有导入对象，再在所属上下文上销毁所有存活 fence。
    pub(super) fn destroy(mut self) {
        let context = self.context.upgrade();
        for slot in self.slots.iter_mut() {
            slot.imported = None;
            let Some((id, fence)) = slot.fence.take() else {
                continue;
            };
            match &context {
                Some(context) => context.destroy_gpu_fence(id, fence),
                None => tracing::warn!(fence_id = id.0, "context gone; fence not destroyed"),
            }
        }
    }
}
