//! ### English
//! Cross-context GPU synchronization: producer contexts, fence-set rings, device waits and the
//! mailbox/sync-token value types.
//!
//! ### 中文
//! 跨上下文 GPU 同步：生产者上下文、fence set 环、设备等待以及 mailbox/sync token 值类型。
mod context;
pub mod current;
mod device_wait;
mod fence_set;
mod gl;
mod mailbox;
mod pool;

pub use context::{
    FENCE_CREATION_TIMEOUT, FenceCompleter, FenceId, GpuFence, PendingFence, ProducerContext,
};
pub use device_wait::{DeviceType, ImportedFence, SecondaryDevice, UnsupportedDevice};
pub use gl::{GlActivation, GlProducerContext, GlProducerContextInit, GlSecondaryDevice};
pub use mailbox::{
    CommandBufferNamespace, ContextMailbox, ContextSyncToken, MAILBOX_NAME_LEN, Mailbox,
    ReleaseCallback, SyncToken, mailbox_from_context, sync_token_from_context,
};
pub use pool::{FenceSetCreateInfo, FenceSetHandle, FenceSetPool};
