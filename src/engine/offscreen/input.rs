//! ### English
//! Mouse events and hit-test results for offscreen views.
//!
//! ### 中文
//! 离屏 view 的鼠标事件与命中测试结果。

use super::host::{ProxyId, ViewId};
use crate::engine::geometry::{Point, Rect};

/// ### English
/// Mouse event kind.
///
/// ### 中文
/// 鼠标事件类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseEventKind {
    Move,
    Down,
    Up,
    Leave,
}

/// ### English
/// A mouse event in widget coordinates (DIP).
///
/// ### 中文
/// 控件坐标系（DIP）下的鼠标事件。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub position: Point,
    /// ### English
    /// Button index (embedder-defined).
    ///
    /// ### 中文
    /// 按键索引（宿主定义）。
    pub button: u32,
    pub modifiers: u32,
}

/// ### English
/// A mouse wheel event in widget coordinates (DIP).
///
/// ### 中文
/// 控件坐标系（DIP）下的鼠标滚轮事件。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseWheelEvent {
    pub position: Point,
    pub delta_x: f32,
    pub delta_y: f32,
    pub modifiers: u32,
}

/// ### English
/// Moves an event's position into the coordinate space of `bounds`.
///
/// ### 中文
/// 将事件坐标平移到 `bounds` 的坐标空间。
pub(super) trait Relocate: Sized {
    fn position(&self) -> Point;

    fn relative_to(&self, bounds: &Rect) -> Self;
}

impl Relocate for MouseEvent {
    fn position(&self) -> Point {
        self.position
    }

    fn relative_to(&self, bounds: &Rect) -> Self {
        Self {
            position: offset(self.position, bounds),
            ..*self
        }
    }
}

impl Relocate for MouseWheelEvent {
    fn position(&self) -> Point {
        self.position
    }

    fn relative_to(&self, bounds: &Rect) -> Self {
        Self {
            position: offset(self.position, bounds),
            ..*self
        }
    }
}

#[inline]
fn offset(point: Point, bounds: &Rect) -> Point {
    Point::new(point.x - bounds.x as f32, point.y - bounds.y as f32)
}

/// ### English
/// Where a routed mouse event ended up.
///
/// Proxy hits are returned to the embedder, which owns the proxied view and delivers the
/// (translated) event itself.
///
/// ### 中文
/// 路由后的鼠标事件去向。
///
/// 命中 proxy 时事件返回给宿主：proxy 所代理的视图由宿主持有，由宿主自行投递（已平移坐标的）事件。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MouseTarget<E> {
    Proxy { proxy: ProxyId, event: E },
    Popup { view: ViewId, event: E },
    Widget { view: ViewId, event: E },
    /// ### English
    /// The view is gone; the event was dropped.
    ///
    /// ### 中文
    /// view 已不存在；事件被丢弃。
    Dropped,
}
