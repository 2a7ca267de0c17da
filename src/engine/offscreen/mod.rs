//! ### English
//! Offscreen views: per-widget visibility, sizing, surface-id and painting state machine,
//! owned by a single [`OffscreenViewHost`].
//!
//! ### 中文
//! 离屏 view：每个 widget 的可见性、尺寸、surface id 与绘制状态机，统一由 [`OffscreenViewHost`] 持有。
mod host;
mod input;
mod render_host;
mod surface_id;
mod view;

pub use host::{OffscreenViewHost, ProxyId, TaskPoster, ViewId, ViewProxy};
pub use input::{MouseEvent, MouseEventKind, MouseTarget, MouseWheelEvent};
pub use render_host::RenderWidgetHost;
pub use surface_id::{LocalSurfaceId, LocalSurfaceIdAllocator};
pub use view::{
    AUTO_SCALE_FACTOR, Color, DEFAULT_FRAME_RATE, DEFAULT_SCALE_FACTOR, FORCE_RENDER_FRAMES,
    FORCE_RENDER_INTERVAL, MAX_FRAME_RATE, MIN_FRAME_RATE, OffscreenViewInit, ViewRole,
    clamp_frame_rate,
};
