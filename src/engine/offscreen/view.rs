//! ### English
//! Per-view state and construction parameters.
//!
//! ### 中文
//! 单个 view 的状态与构造参数。

use std::rc::Rc;
use std::time::Duration;

use dpi::{LogicalSize, PhysicalSize};

use super::host::{ProxyId, ViewId};
use super::render_host::RenderWidgetHost;
use super::surface_id::LocalSurfaceIdAllocator;
use crate::engine::compositor::Bitmap;
use crate::engine::geometry::{Rect, scale_to_ceiled_size};
use crate::engine::paint::{FrameSink, PaintInProgress};

/// ### English
/// Manual scale factor value meaning "follow the display".
///
/// ### 中文
/// 表示“跟随显示器”的手动缩放因子取值。
pub const AUTO_SCALE_FACTOR: f32 = 0.0;

pub const DEFAULT_SCALE_FACTOR: f32 = 1.0;

pub const DEFAULT_FRAME_RATE: u32 = 60;

/// ### English
/// Accepted frame-rate range; requests outside it are clamped.
///
/// ### 中文
/// 可接受的帧率范围；超出范围的请求会被钳制。
pub const MIN_FRAME_RATE: u32 = 1;
pub const MAX_FRAME_RATE: u32 = 240;

/// ### English
/// Redraws forced after a backing texture is (re)created, and their spacing (5 Hz).
///
/// ### 中文
/// 后备纹理（重新）创建后强制重绘的次数，以及间隔（5 Hz）。
pub const FORCE_RENDER_FRAMES: u32 = 20;
pub const FORCE_RENDER_INTERVAL: Duration = Duration::from_millis(200);

/// ### English
/// 32-bit ARGB color.
///
/// ### 中文
/// 32 位 ARGB 颜色。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Self = Self(0x0000_0000);
    pub const WHITE: Self = Self(0xFFFF_FFFF);

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn is_opaque(self) -> bool {
        self.alpha() == 0xFF
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// ### English
/// Clamps a requested frame rate into `MIN_FRAME_RATE..=MAX_FRAME_RATE`.
///
/// ### 中文
/// 将请求的帧率钳制到 `MIN_FRAME_RATE..=MAX_FRAME_RATE`。
pub fn clamp_frame_rate(frame_rate: i32) -> u32 {
    frame_rate.clamp(MIN_FRAME_RATE as i32, MAX_FRAME_RATE as i32) as u32
}

/// ### English
/// Construction bundle for a root view.
///
/// ### 中文
/// 根 view 的构造参数包。
pub struct OffscreenViewInit {
    /// ### English
    /// Initial view size in DIP.
    ///
    /// ### 中文
    /// 初始 view 尺寸（DIP）。
    pub size: LogicalSize<u32>,
    /// ### English
    /// Whether the background is transparent (applied on first navigation).
    ///
    /// ### 中文
    /// 背景是否透明（首次导航时生效）。
    pub transparent: bool,
    pub painting: bool,
    /// ### English
    /// Requested frame rate; clamped to `1..=240`.
    ///
    /// ### 中文
    /// 请求的帧率；会被钳制到 `1..=240`。
    pub frame_rate: u32,
    /// ### English
    /// Manual scale factor, or [`AUTO_SCALE_FACTOR`].
    ///
    /// ### 中文
    /// 手动缩放因子，或 [`AUTO_SCALE_FACTOR`]。
    pub scale_factor: f32,
    pub start_hidden: bool,
    pub render_host: Rc<dyn RenderWidgetHost>,
    pub sink: Rc<dyn FrameSink>,
}

impl OffscreenViewInit {
    /// ### English
    /// Defaults: 0x0 DIP, opaque, painting, 60 fps, automatic scale, shown.
    ///
    /// ### 中文
    /// 默认值：0x0 DIP、不透明、绘制中、60 fps、自动缩放、可见。
    pub fn new(render_host: Rc<dyn RenderWidgetHost>, sink: Rc<dyn FrameSink>) -> Self {
        Self {
            size: LogicalSize::new(0, 0),
            transparent: false,
            painting: true,
            frame_rate: DEFAULT_FRAME_RATE,
            scale_factor: AUTO_SCALE_FACTOR,
            start_hidden: false,
            render_host,
            sink,
        }
    }
}

/// ### English
/// How a view is attached to its parent.
///
/// ### 中文
/// view 与其父 view 的关联方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewRole {
    Root,
    /// ### English
    /// Created for a parent but not yet initialized as popup or child.
    ///
    /// ### 中文
    /// 已为父 view 创建，但尚未初始化为 popup 或 child。
    Detached,
    Popup,
    Child,
}

pub(super) struct OffscreenView {
    pub(super) render_host: Rc<dyn RenderWidgetHost>,
    pub(super) sink: Rc<dyn FrameSink>,
    pub(super) role: ViewRole,
    pub(super) parent: Option<ViewId>,
    pub(super) popup: Option<ViewId>,
    pub(super) child: Option<ViewId>,
    pub(super) proxies: Vec<ProxyId>,

    pub(super) size: LogicalSize<u32>,
    /// ### English
    /// Popup placement in the parent (DIP). Only meaningful for popups.
    ///
    /// ### 中文
    /// popup 在父 view 中的位置（DIP）。仅对 popup 有意义。
    pub(super) popup_position: Rect,

    pub(super) is_showing: bool,
    pub(super) hold_resize: bool,
    pub(super) pending_resize: bool,
    pub(super) painting: bool,
    pub(super) transparent: bool,
    pub(super) is_first_navigation: bool,
    pub(super) is_destroyed: bool,

    pub(super) frame_rate: u32,
    /// ### English
    /// Last frame rate pushed to the render host, to skip redundant vsync updates.
    ///
    /// ### 中文
    /// 上次推送给 render host 的帧率，用于跳过重复的 vsync 更新。
    pub(super) applied_frame_rate: Option<u32>,
    pub(super) manual_scale_factor: f32,
    pub(super) current_scale_factor: f32,

    pub(super) root_layer_size: PhysicalSize<u32>,
    pub(super) root_layer_scale: f32,

    pub(super) background_color: Color,
    pub(super) surface_ids: LocalSurfaceIdAllocator,
    pub(super) backing: Bitmap,
    pub(super) paint_in_progress: PaintInProgress,
}

impl OffscreenView {
    pub(super) fn new(init: OffscreenViewInit, role: ViewRole, parent: Option<ViewId>) -> Self {
        let OffscreenViewInit {
            size,
            transparent,
            painting,
            frame_rate,
            scale_factor,
            start_hidden: _,
            render_host,
            sink,
        } = init;

        Self {
            render_host,
            sink,
            role,
            parent,
            popup: None,
            child: None,
            proxies: Vec::new(),
            size,
            popup_position: Rect::default(),
            is_showing: false,
            hold_resize: false,
            pending_resize: false,
            painting,
            transparent,
            is_first_navigation: true,
            is_destroyed: false,
            frame_rate: clamp_frame_rate(frame_rate.min(i32::MAX as u32) as i32),
            applied_frame_rate: None,
            manual_scale_factor: scale_factor,
            current_scale_factor: DEFAULT_SCALE_FACTOR,
            root_layer_size: PhysicalSize::new(0, 0),
            root_layer_scale: DEFAULT_SCALE_FACTOR,
            background_color: Color::WHITE,
            surface_ids: LocalSurfaceIdAllocator::new(),
            backing: Bitmap::empty(),
            paint_in_progress: PaintInProgress::default(),
        }
    }

    pub(super) fn is_popup(&self) -> bool {
        self.role == ViewRole::Popup
    }

    pub(super) fn using_auto_scale_factor(&self) -> bool {
        self.manual_scale_factor == AUTO_SCALE_FACTOR
    }

    pub(super) fn scale_factor(&self) -> f32 {
        if self.using_auto_scale_factor() {
            self.current_scale_factor
        } else {
            self.manual_scale_factor
        }
    }

    /// ### English
    /// View size in pixels at the current device scale factor.
    ///
    /// ### 中文
    /// 当前设备缩放因子下的 view 像素尺寸。
    pub(super) fn size_in_pixels(&self) -> PhysicalSize<u32> {
        let dip = if self.is_popup() {
            self.popup_position.logical_size()
        } else {
            self.size
        };
        scale_to_ceiled_size(dip, self.current_scale_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_is_clamped() {
        assert_eq!(clamp_frame_rate(0), 1);
        assert_eq!(clamp_frame_rate(-5), 1);
        assert_eq!(clamp_frame_rate(144), 144);
        assert_eq!(clamp_frame_rate(1000), 240);
    }

    #[test]
    fn color_alpha() {
        assert!(Color::WHITE.is_opaque());
        assert!(!Color::TRANSPARENT.is_opaque());
        assert_eq!(Color(0x80FF_0000).alpha(), 0x80);
    }
}
