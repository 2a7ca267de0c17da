//! ### English
//! Crate-wide error type for fence sets, device waits, and view bookkeeping.
//!
//! ### 中文
//! 覆盖 fence set、设备等待与 view 管理的 crate 级错误类型。

/// ### English
/// Result alias used across the engine.
///
/// ### 中文
/// 引擎内统一使用的 Result 别名。
pub type OffscreenResult<T> = Result<T, OffscreenError>;

/// ### English
/// Coarse failure class, used by the C ABI and diagnostics.
///
/// ### 中文
/// 粗粒度的失败类别，供 C ABI 与诊断使用。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Unsupported,
    ResourceExhausted,
    NotFound,
}

#[derive(thiserror::Error, Debug)]
pub enum OffscreenError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid handle")]
    InvalidHandle,

    #[error("no GPU context is current on this thread")]
    NoCurrentContext,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("fence creation failed: {0}")]
    FenceCreationFailed(String),

    #[error("device wait failed: {0}")]
    DeviceWaitFailed(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl OffscreenError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn fence_creation(msg: impl Into<String>) -> Self {
        Self::FenceCreationFailed(msg.into())
    }

    pub fn device_wait(msg: impl Into<String>) -> Self {
        Self::DeviceWaitFailed(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// ### English
    /// Maps this error onto its failure class.
    ///
    /// Bad handles and a missing current context are argument errors from the caller's point of
    /// view; every driver-level creation or wait failure counts as resource exhaustion.
    ///
    /// ### 中文
    /// 将错误映射到其失败类别。
    ///
    /// 无效句柄与缺少 current 上下文对调用方而言属于参数错误；驱动层的创建/等待失败统一归为资源耗尽。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::InvalidHandle | Self::NoCurrentContext => {
                ErrorKind::InvalidArgument
            }
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::FenceCreationFailed(_)
            | Self::DeviceWaitFailed(_)
            | Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            OffscreenError::invalid_argument("x")
                .to_string()
                .contains("invalid argument:")
        );
        assert!(
            OffscreenError::unsupported("d3d11")
                .to_string()
                .contains("unsupported:")
        );
        assert!(
            OffscreenError::device_wait("x")
                .to_string()
                .contains("device wait failed:")
        );
        assert_eq!(OffscreenError::InvalidHandle.to_string(), "invalid handle");
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            OffscreenError::InvalidHandle.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            OffscreenError::NoCurrentContext.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            OffscreenError::unsupported("x").kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            OffscreenError::fence_creation("x").kind(),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(
            OffscreenError::device_wait("x").kind(),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(OffscreenError::not_found("x").kind(), ErrorKind::NotFound);
    }
}
