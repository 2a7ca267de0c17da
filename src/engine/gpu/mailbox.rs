//! ### English
//! Portable value types for GPU-backed images (`Mailbox`) and GPU stream positions (`SyncToken`),
//! plus the once-only release callback that travels with every texture frame.
//!
//! ### 中文
//! GPU 图像（`Mailbox`）与 GPU 命令流位置（`SyncToken`）的可移植值类型，
//! 以及随每个纹理帧传递的一次性释放回调。

use std::cmp::Ordering;
use std::fmt;

/// ### English
/// Length of a mailbox name in bytes.
///
/// ### 中文
/// mailbox 名称的字节长度。
pub const MAILBOX_NAME_LEN: usize = 16;

/// ### English
/// Opaque reference to a GPU-resident image, resolved by the owning graphics context.
///
/// Equality and ordering compare the raw bytes (name first, then the shared-image flag). The
/// mailbox does not own GPU memory.
///
/// ### 中文
/// 指向 GPU 驻留图像的不透明引用，由所属图形上下文解析。
///
/// 相等与排序按原始字节比较（先名称，后 shared-image 标记）。mailbox 本身不持有 GPU 内存。
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Mailbox {
    pub name: [i8; MAILBOX_NAME_LEN],
    pub shared_image: bool,
}

impl Mailbox {
    pub const fn new(name: [i8; MAILBOX_NAME_LEN], shared_image: bool) -> Self {
        Self { name, shared_image }
    }

    /// ### English
    /// Returns whether every name byte is zero (the "no image" mailbox).
    ///
    /// ### 中文
    /// 名称字节是否全为 0（即“无图像”的 mailbox）。
    pub fn is_zero(&self) -> bool {
        self.name.iter().all(|&b| b == 0)
    }

    /// ### English
    /// Name bytes reinterpreted as unsigned, in the order they are stored.
    ///
    /// ### 中文
    /// 以无符号形式返回名称字节（保持存储顺序）。
    pub fn name_bytes(&self) -> [u8; MAILBOX_NAME_LEN] {
        self.name.map(|b| b as u8)
    }

    pub fn from_name_bytes(bytes: [u8; MAILBOX_NAME_LEN], shared_image: bool) -> Self {
        Self {
            name: bytes.map(|b| b as i8),
            shared_image,
        }
    }
}

impl PartialOrd for Mailbox {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Mailbox {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name_bytes()
            .cmp(&other.name_bytes())
            .then_with(|| u8::from(self.shared_image).cmp(&u8::from(other.shared_image)))
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mailbox(")?;
        for byte in self.name_bytes() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ", shared_image={})", self.shared_image)
    }
}

/// ### English
/// Command-buffer namespace of a sync token.
///
/// ### 中文
/// sync token 所属的 command buffer 命名空间。
#[repr(i8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CommandBufferNamespace {
    #[default]
    Invalid = -1,
    GpuIo = 0,
    InProcess = 1,
    VizSkiaOutputSurface = 2,
    VizSkiaOutputSurfaceNonDdl = 3,
}

impl CommandBufferNamespace {
    /// ### English
    /// Converts a raw namespace value; unknown values become `Invalid`.
    ///
    /// ### 中文
    /// 转换原始命名空间值；未知值映射为 `Invalid`。
    pub fn from_raw(value: i8) -> Self {
        match value {
            0 => Self::GpuIo,
            1 => Self::InProcess,
            2 => Self::VizSkiaOutputSurface,
            3 => Self::VizSkiaOutputSurfaceNonDdl,
            _ => Self::Invalid,
        }
    }

    pub fn as_raw(self) -> i8 {
        self as i8
    }
}

/// ### English
/// A point in one GPU command stream. Inert data: captured once, compared, never mutated.
///
/// `SyncToken::default()` is the empty token handed back when a frame is released without any
/// GPU work to wait on.
///
/// ### 中文
/// 某条 GPU 命令流中的一个位置。纯数据：捕获后只比较、不修改。
///
/// `SyncToken::default()` 为空 token：在没有需要等待的 GPU 工作时随释放一并返回。
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SyncToken {
    pub verified_flush: bool,
    pub namespace_id: CommandBufferNamespace,
    pub command_buffer_id: u64,
    pub release_count: u64,
}

impl SyncToken {
    pub const fn new(
        verified_flush: bool,
        namespace_id: CommandBufferNamespace,
        command_buffer_id: u64,
        release_count: u64,
    ) -> Self {
        Self {
            verified_flush,
            namespace_id,
            command_buffer_id,
            release_count,
        }
    }

    pub fn has_data(&self) -> bool {
        self.namespace_id != CommandBufferNamespace::Invalid
    }
}

/// ### English
/// A producer-side mailbox representation the bridge can copy from.
///
/// Implemented by graphics contexts that keep their own mailbox layout.
///
/// ### 中文
/// 生产者侧的 mailbox 表示，桥接层可从中复制。
///
/// 由持有自身 mailbox 布局的图形上下文实现。
pub trait ContextMailbox {
    fn name(&self) -> [u8; MAILBOX_NAME_LEN];
    fn is_shared_image(&self) -> bool;
}

/// ### English
/// A producer-side sync-token representation the bridge can copy from.
///
/// ### 中文
/// 生产者侧的 sync token 表示，桥接层可从中复制。
pub trait ContextSyncToken {
    fn verified_flush(&self) -> bool;
    fn namespace_id(&self) -> i8;
    fn command_buffer_id(&self) -> u64;
    fn release_count(&self) -> u64;
}

/// ### English
/// Copies a context-local mailbox into the portable value type (byte-exact).
///
/// ### 中文
/// 将上下文本地的 mailbox 逐字节复制为可移植值类型。
pub fn mailbox_from_context(source: &impl ContextMailbox) -> Mailbox {
    Mailbox::from_name_bytes(source.name(), source.is_shared_image())
}

/// ### English
/// Copies a context-local sync token into the portable value type.
///
/// ### 中文
/// 将上下文本地的 sync token 复制为可移植值类型。
pub fn sync_token_from_context(source: &impl ContextSyncToken) -> SyncToken {
    SyncToken {
        verified_flush: source.verified_flush(),
        namespace_id: CommandBufferNamespace::from_raw(source.namespace_id()),
        command_buffer_id: source.command_buffer_id(),
        release_count: source.release_count(),
    }
}

type ReleaseFn = Box<dyn FnOnce(SyncToken) + Send>;

/// ### English
/// Once-only release of a GPU-backed frame.
///
/// Whoever ends up holding this value must call [`ReleaseCallback::run`] with the sync token after
/// which the image may be recycled. Running consumes the value, so a second release cannot be
/// expressed. Dropping it un-run releases with the empty token (and logs), so a forgotten frame
/// never leaks the image.
///
/// ### 中文
/// GPU 帧的一次性释放。
///
/// 最终持有者必须调用 [`ReleaseCallback::run`]，并传入图像可被回收之后的 sync token。`run` 会消耗该值，
/// 因此无法表达第二次释放。未运行即被 drop 时会以空 token 释放（并记录日志），被遗忘的帧不会泄漏图像。
#[must_use = "a texture frame must be released exactly once"]
pub struct ReleaseCallback {
    release: Option<ReleaseFn>,
}

impl ReleaseCallback {
    pub fn new(release: impl FnOnce(SyncToken) + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// ### English
    /// A release that does nothing (frames that carry no image).
    ///
    /// ### 中文
    /// 不执行任何操作的释放（用于不携带图像的帧）。
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// ### English
    /// Releases the frame once the consumer's work reaches `sync_token`.
    ///
    /// ### 中文
    /// 在消费者的 GPU 工作到达 `sync_token` 后释放该帧。
    pub fn run(mut self, sync_token: SyncToken) {
        if let Some(release) = self.release.take() {
            release(sync_token);
        }
    }

    /// ### English
    /// Releases with the empty token (no consumer work to wait for).
    ///
    /// ### 中文
    /// 以空 token 释放（无需等待消费者工作）。
    pub fn release_unused(self) {
        self.run(SyncToken::default());
    }
}

impl fmt::Debug for ReleaseCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseCallback")
            .field("pending", &self.release.is_some())
            .finish()
    }
}

impl Drop for ReleaseCallback {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::warn!("texture frame dropped without release; releasing with empty token");
            release(SyncToken::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    use super::*;

    struct LocalMailbox([u8; 16], bool);

    impl ContextMailbox for LocalMailbox {
        fn name(&self) -> [u8; MAILBOX_NAME_LEN] {
            self.0
        }
        fn is_shared_image(&self) -> bool {
            self.1
        }
    }

    struct LocalToken;

    impl ContextSyncToken for LocalToken {
        fn verified_flush(&self) -> bool {
            true
        }
        fn namespace_id(&self) -> i8 {
            2
        }
        fn command_buffer_id(&self) -> u64 {
            0xDEAD_BEEF_0000_0001
        }
        fn release_count(&self) -> u64 {
            u64::MAX
        }
    }

    #[test]
    fn bridge_copies_fields_exactly() {
        let mut name = [0u8; 16];
        for (i, b) in name.iter_mut().enumerate() {
            *b = 0xF0 + i as u8;
        }
        let mailbox = mailbox_from_context(&LocalMailbox(name, true));
        assert_eq!(mailbox.name_bytes(), name);
        assert!(mailbox.shared_image);

        let token = sync_token_from_context(&LocalToken);
        assert_eq!(
            token,
            SyncToken::new(
                true,
                CommandBufferNamespace::VizSkiaOutputSurface,
                0xDEAD_BEEF_0000_0001,
                u64::MAX
            )
        );
    }

    #[test]
    fn ordering_is_bytewise_unsigned() {
        let low = Mailbox::from_name_bytes([0x01; 16], false);
        let high = Mailbox::from_name_bytes([0x80; 16], false);
        assert!(low < high);
        let flagged = Mailbox::from_name_bytes([0x01; 16], true);
        assert!(low < flagged);
        assert_ne!(low, flagged);
    }

    #[test]
    fn unknown_namespace_maps_to_invalid() {
        assert_eq!(
            CommandBufferNamespace::from_raw(42),
            CommandBufferNamespace::Invalid
        );
        assert_eq!(CommandBufferNamespace::InProcess.as_raw(), 1);
        assert!(!SyncToken::default().has_data());
    }

    #[test]
    fn release_runs_once_even_when_dropped() {
        let count = Arc::new(AtomicU32::new(0));

        let c = count.clone();
        ReleaseCallback::new(move |_| {
            c.fetch_add(1, AtomicOrdering::SeqCst);
        })
        .run(SyncToken::default());
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);

        let c = count.clone();
        let forgotten = ReleaseCallback::new(move |token| {
            assert_eq!(token, SyncToken::default());
            c.fetch_add(1, AtomicOrdering::SeqCst);
        });
        drop(forgotten);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 2);
    }
}
