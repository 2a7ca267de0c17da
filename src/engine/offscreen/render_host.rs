//! ### English
//! The render-widget host seam: everything a view tells the rendering engine.
//!
//! ### 中文
//! render widget host 接口：view 需要通知渲染引擎的全部操作。

use std::time::Duration;

use dpi::PhysicalSize;

use super::input::{MouseEvent, MouseWheelEvent};
use super::surface_id::LocalSurfaceId;
use super::view::Color;
use crate::engine::geometry::Rect;

/// ### English
/// Rendering-engine side of one view. All methods default to no-ops so fakes stay small.
///
/// ### 中文
/// 单个 view 的渲染引擎侧接口。所有方法默认空实现，以便测试替身保持精简。
pub trait RenderWidgetHost {
    fn was_shown(&self) {}

    fn was_hidden(&self) {}

    /// ### English
    /// Asks the renderer to pull new visual properties (size, scale, surface id).
    ///
    /// ### 中文
    /// 请求渲染器拉取新的视觉属性（尺寸、缩放、surface id）。
    fn synchronize_visual_properties(&self) {}

    /// ### English
    /// Embeds `surface_id` at `size` (pixels) in the compositor.
    ///
    /// ### 中文
    /// 以 `size`（像素）在合成器中嵌入 `surface_id`。
    fn embed_surface(&self, _surface_id: LocalSurfaceId, _size: PhysicalSize<u32>) {}

    fn lost_capture(&self) {}

    fn set_begin_frames_enabled(&self, _enabled: bool) {}

    fn set_vsync_interval(&self, _interval: Duration) {}

    fn set_background_color(&self, _color: Color) {}

    /// ### English
    /// Schedules a redraw (`None` = full) and issues a begin-frame.
    ///
    /// ### 中文
    /// 安排重绘（`None` 表示全量）并发出 begin-frame。
    fn invalidate(&self, _rect: Option<Rect>) {}

    fn forward_mouse_event(&self, _event: &MouseEvent) {}

    fn forward_mouse_wheel_event(&self, _event: &MouseWheelEvent) {}

    /// ### English
    /// Tears the widget down on the engine side (the view is destroyed separately).
    ///
    /// ### 中文
    /// 在引擎侧销毁该 widget（view 本身另行销毁）。
    fn shutdown_widget(&self) {}
}
