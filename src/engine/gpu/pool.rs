//! ### English
//! Fence-set pool: an arena of fence sets addressed by `index + generation` handles.
//!
//! ### 中文
//! fence set 池：以 `index + generation` 句柄寻址的 fence set arena。

use super::current;
use super::device_wait::SecondaryDevice;
use super::fence_set::FenceSet;
use crate::engine::error::{OffscreenError, OffscreenResult};

/// ### English
/// Stable handle to a fence set. A handle whose set was destroyed never becomes valid again.
///
/// ### 中文
/// fence set 的稳定句柄。其 set 被销毁后，该句柄永远不会再次有效。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FenceSetHandle {
    index: u32,
    generation: u32,
}

impl FenceSetHandle {
    /// ### English
    /// Packs the handle into an opaque non-zero integer for the C ABI.
    ///
    /// ### 中文
    /// 将句柄打包为非零的不透明整数，供 C ABI 使用。
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

/// ### English
/// Parameters for [`FenceSetPool::create`].
///
/// ### 中文
/// [`FenceSetPool::create`] 的参数。
pub struct FenceSetCreateInfo {
    /// ### English
    /// Ring size. Callers keep at most `num_fences - 1` dependencies in flight.
    ///
    /// ### 中文
    /// ring 大小。调用方同时在途的依赖数至多为 `num_fences - 1`。
    pub num_fences: usize,
    /// ### English
    /// Device that waits on the produced fences. `None` is rejected.
    ///
    /// ### 中文
    /// 等待生产 fence 的设备。`None` 会被拒绝。
    pub device: Option<Box<dyn SecondaryDevice>>,
}

struct PoolEntry {
    generation: u32,
    set: Option<FenceSet>,
}

/// ### English
/// Owns every fence set created on one thread.
///
/// Not `Send`: fence sets hold the producer context, which is bound to the creating thread.
/// Free slots are reused first-fit; the pool shrinks only when its last slot is freed, so other
/// handles keep their index.
///
/// ### 中文
/// 持有某一线程上创建的全部 fence set。
///
/// 非 `Send`：fence set 持有绑定到创建线程的生产者上下文。空闲槽位按首次适配复用；
/// 仅当最后一个槽位被释放时才收缩，其他句柄的索引保持不变。
#[derive(Default)]
pub struct FenceSetPool {
    entries: Vec<PoolEntry>,
    next_generation: u32,
}

impl FenceSetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Creates a fence set bound to the calling thread's current producer context.
    ///
    /// ### 中文
    /// 创建绑定到调用线程当前生产者上下文的 fence set。
    #[tracing::instrument(level = "debug", skip(self, info), fields(num_fences = info.num_fences))]
    pub fn create(&mut self, info: FenceSetCreateInfo) -> OffscreenResult<FenceSetHandle> {
        let FenceSetCreateInfo { num_fences, device } = info;
        if num_fences == 0 {
            return Err(OffscreenError::invalid_argument("num_fences must be non-zero"));
        }
        let Some(device) = device else {
            return Err(OffscreenError::invalid_argument("missing secondary device"));
        };
        let Some(context) = current::current_context() else {
            tracing::error!("unable to get current GPU context");
            return Err(OffscreenError::NoCurrentContext);
        };

        self.next_generation = self.next_generation.wrapping_add(1).max(1);
        let generation = self.next_generation;
        let set = FenceSet::new(num_fences, &context, device);

        let index = match self.entries.iter().position(|e| e.set.is_none()) {
            Some(index) => {
                self.entries[index] = PoolEntry {
                    generation,
                    set: Some(set),
                };
                index
            }
            None => {
                self.entries.push(PoolEntry {
                    generation,
                    set: Some(set),
                });
                self.entries.len() - 1
            }
        };
        let index = u32::try_from(index)
            .map_err(|_| OffscreenError::ResourceExhausted("fence set pool is full".into()))?;

        tracing::debug!(index, generation, "fence set created");
        Ok(FenceSetHandle { index, generation })
    }

    /// ### English
    /// Destroys a fence set and its fences.
    ///
    /// Does not wait for GPU work: the caller guarantees nothing still references the set's fences.
    ///
    /// ### 中文
    /// 销毁 fence set 及其 fence。
    ///
    /// 不会等待 GPU 工作：调用方需保证已没有任何工作引用该 set 的 fence。
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, handle: FenceSetHandle) -> OffscreenResult<()> {
        let set = self
            .entry_mut(handle)
            .and_then(|entry| entry.set.take())
            .ok_or(OffscreenError::InvalidHandle)?;
        set.destroy();

        if handle.index as usize == self.entries.len() - 1 {
            self.entries.pop();
        }
        Ok(())
    }

    /// ### English
    /// Inserts one producer-to-secondary dependency into the set's ring.
    ///
    /// More than `num_fences - 1` dependencies in flight silently evicts the oldest.
    ///
    /// ### 中文
    /// 向 set 的 ring 插入一个“生产者 → 第二设备”依赖。
    ///
    /// 在途依赖超过 `num_fences - 1` 时会静默淘汰最旧的一个。
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn insert_dependency(&mut self, handle: FenceSetHandle) -> OffscreenResult<()> {
        let set = self.set_mut(handle)?;
        let slot = set.insert_dependency()?;
        tracing::trace!(slot, "dependency inserted");
        Ok(())
    }

    /// ### English
    /// Number of arena slots, including freed ones that are not at the end.
    ///
    /// ### 中文
    /// arena 槽位数量（包含未位于末尾的空闲槽位）。
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn live_sets(&self) -> usize {
        self.entries.iter().filter(|e| e.set.is_some()).count()
    }

    pub fn contains(&self, handle: FenceSetHandle) -> bool {
        self.set(handle).is_ok()
    }

    /// ### English
    /// Ring size and the slot the next `insert_dependency` will use.
    ///
    /// ### 中文
    /// ring 大小，以及下一次 `insert_dependency` 将使用的槽位。
    pub fn ring_position(&self, handle: FenceSetHandle) -> OffscreenResult<(usize, usize)> {
        let set = self.set(handle)?;
        Ok((set.num_fences(), set.cursor()))
    }

    /// ### English
    /// Which ring slots currently hold a live fence.
    ///
    /// ### 中文
    /// 返回各 ring 槽位当前是否持有存活 fence。
    pub fn live_slots(&self, handle: FenceSetHandle) -> OffscreenResult<Vec<bool>> {
        let set = self.set(handle)?;
        Ok((0..set.num_fences()).map(|i| set.is_slot_live(i)).collect())
    }

    fn entry_mut(&mut self, handle: FenceSetHandle) -> Option<&mut PoolEntry> {
        self.entries
            .get_mut(handle.index as usize)
            .filter(|entry| entry.generation == handle.generation)
    }

    fn set(&self, handle: FenceSetHandle) -> OffscreenResult<&FenceSet> {
        self.entries
            .get(handle.index as usize)
            .filter(|entry| entry.generation == handle.generation)
            .and_then(|entry| entry.set.as_ref())
            .ok_or(OffscreenError::InvalidHandle)
    }

    fn set_mut(&mut self, handle: FenceSetHandle) -> OffscreenResult<&mut FenceSet> {
        self.entry_mut(handle)
            .and_then(|entry| entry.set.as_mut())
            .ok_or(OffscreenError::InvalidHandle)
    }
}

impl Drop for FenceSetPool {
    fn drop(&mut self) {
        for entry in self.entries.drain(..) {
            if let Some(set) = entry.set {
                set.destroy();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_handles_round_trip_and_are_non_zero() {
        let handle = FenceSetHandle {
            index: 3,
            generation: 9,
        };
        assert_ne!(handle.to_raw(), 0);
        assert_eq!(FenceSetHandle::from_raw(handle.to_raw()), handle);
    }

    #[test]
    fn create_requires_fences_and_device() {
        let mut pool = FenceSetPool::new();
        let err = pool
            .create(FenceSetCreateInfo {
                num_fences: 0,
                device: None,
            })
            .unwrap_err();
        assert!(matches!(err, OffscreenError::InvalidArgument(_)));

        let err = pool
            .create(FenceSetCreateInfo {
                num_fences: 2,
                device: None,
            })
            .unwrap_err();
        assert!(matches!(err, OffscreenError::InvalidArgument(_)));
        assert_eq!(pool.capacity(), 0);
    }

    #[test]
    fn unknown_handles_are_rejected() {
        let mut pool = FenceSetPool::new();
        let bogus = FenceSetHandle::from_raw(0x0000_0001_0000_0000);
        assert!(matches!(
            pool.destroy(bogus),
            Err(OffscreenError::InvalidHandle)
        ));
        assert!(matches!(
            pool.insert_dependency(bogus),
            Err(OffscreenError::InvalidHandle)
        ));
    }
}
