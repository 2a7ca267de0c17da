//! ### English
//! Cross-API device wait: makes a secondary device's future work wait on a producer fence.
//!
//! ### 中文
//! 跨 API 设备等待：让第二设备之后的工作等待生产者 fence。

use std::any::Any;
use std::fmt;

use super::context::GpuFence;
use crate::engine::error::{OffscreenError, OffscreenResult};

/// ### English
/// Kind of secondary device a fence set waits on (matches the C ABI descriptor tag).
///
/// ### 中文
/// fence set 所等待的第二设备类型（与 C ABI 描述符标签一致）。
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceType {
    Gl = 0,
    D3D11 = 1,
}

impl DeviceType {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Gl),
            1 => Some(Self::D3D11),
            _ => None,
        }
    }
}

/// ### English
/// Secondary-device object created while importing a fence.
///
/// Some platforms invalidate in-flight waits if the imported object is released early, so fence
/// sets keep it alive until the same ring slot comes around again.
///
/// ### 中文
/// 导入 fence 时在第二设备上创建的对象。
///
/// 某些平台上过早释放该对象会使正在进行的等待失效，因此 fence set 会持有它，直到同一 ring 槽位再次被使用。
pub struct ImportedFence {
    retained: Option<Box<dyn Any>>,
}

impl ImportedFence {
    pub fn new(retained: impl Any) -> Self {
        Self {
            retained: Some(Box::new(retained)),
        }
    }

    /// ### English
    /// Nothing to retain (the wait needed no device-side import).
    ///
    /// ### 中文
    /// 无需保留任何对象（等待不需要设备侧导入）。
    pub fn none() -> Self {
        Self { retained: None }
    }

    pub fn is_retaining(&self) -> bool {
        self.retained.is_some()
    }
}

impl fmt::Debug for ImportedFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedFence")
            .field("retaining", &self.is_retaining())
            .finish()
    }
}

/// ### English
/// A device (usually another graphics API) that consumes producer images.
///
/// `wait` must not block the CPU: it only enqueues a device-side wait.
///
/// ### 中文
/// 消费生产者图像的设备（通常是另一种图形 API）。
///
/// `wait` 不得阻塞 CPU：它只在设备侧排入一次等待。
pub trait SecondaryDevice {
    fn device_type(&self) -> DeviceType;

    fn wait(&self, fence: &GpuFence) -> OffscreenResult<ImportedFence>;
}

/// ### English
/// A device whose backend is not available in this build. Every wait fails with `Unsupported`.
///
/// ### 中文
/// 本构建中不可用的设备后端。每次等待都以 `Unsupported` 失败。
#[derive(Debug)]
pub struct UnsupportedDevice {
    device_type: DeviceType,
}

impl UnsupportedDevice {
    pub fn new(device_type: DeviceType) -> Self {
        Self { device_type }
    }
}

impl SecondaryDevice for UnsupportedDevice {
    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn wait(&self, _fence: &GpuFence) -> OffscreenResult<ImportedFence> {
        tracing::error!(device_type = ?self.device_type, "device wait is not supported on this platform");
        Err(OffscreenError::unsupported(format!(
            "{:?} device wait on this platform",
            self.device_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_device_fails_hard() {
        let device = UnsupportedDevice::new(DeviceType::D3D11);
        let err = device.wait(&GpuFence::from_raw(1)).unwrap_err();
        assert_eq!(err.kind(), crate::engine::error::ErrorKind::Unsupported);
    }

    #[test]
    fn device_type_tags_round_trip() {
        assert_eq!(DeviceType::from_raw(0), Some(DeviceType::Gl));
        assert_eq!(DeviceType::from_raw(1), Some(DeviceType::D3D11));
        assert_eq!(DeviceType::from_raw(9), None);
    }
}
