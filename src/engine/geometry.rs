//! ### English
//! Integer rectangles/points used for damage tracking, popup placement, and hit-testing.
//!
//! Sizes use `dpi`: `LogicalSize<u32>` for DIP view sizes and `PhysicalSize<u32>` for pixels.
//!
//! ### 中文
//! 用于 damage 追踪、popup 定位与命中测试的整数矩形/点。
//!
//! 尺寸使用 `dpi`：`LogicalSize<u32>` 表示 DIP 视图尺寸，`PhysicalSize<u32>` 表示像素尺寸。

use dpi::{LogicalSize, PhysicalSize};
use euclid::default::{Box2D, Point2D};

/// ### English
/// A point in widget coordinates.
///
/// ### 中文
/// 控件坐标系下的一个点。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// ### English
/// Axis-aligned integer rectangle (`x`, `y` may be negative; `width`/`height` never are).
///
/// ### 中文
/// 轴对齐的整数矩形（`x`、`y` 可为负；`width`/`height` 非负）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: if width < 0 { 0 } else { width },
            height: if height < 0 { 0 } else { height },
        }
    }

    /// ### English
    /// Rectangle at the origin covering `size` pixels.
    ///
    /// ### 中文
    /// 位于原点、覆盖 `size` 像素的矩形。
    pub fn from_size(size: PhysicalSize<u32>) -> Self {
        Self::new(0, 0, clamp_u32(size.width), clamp_u32(size.height))
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.width as u32, self.height as u32)
    }

    pub fn logical_size(&self) -> LogicalSize<u32> {
        LogicalSize::new(self.width as u32, self.height as u32)
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn with_size(&self, size: PhysicalSize<u32>) -> Self {
        Self::new(self.x, self.y, clamp_u32(size.width), clamp_u32(size.height))
    }

    pub fn with_origin(&self, x: i32, y: i32) -> Self {
        Self::new(x, y, self.width, self.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.to_box()
            .to_f64()
            .contains(Point2D::new(f64::from(point.x), f64::from(point.y)))
    }

    /// ### English
    /// Smallest rectangle containing both; an empty operand is ignored.
    ///
    /// The result saturates at the `i32` range instead of overflowing.
    ///
    /// ### 中文
    /// 同时包含两者的最小矩形；空矩形不参与合并。
    ///
    /// 结果在 `i32` 范围内饱和，而不会溢出。
    pub fn union(&self, other: &Rect) -> Rect {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Self::from_box(self.to_box().union(&other.to_box()))
    }

    /// ### English
    /// Overlap of both rectangles, or an empty rectangle when they do not overlap.
    ///
    /// ### 中文
    /// 两矩形的交集；不相交时返回空矩形。
    pub fn intersect(&self, other: &Rect) -> Rect {
        self.to_box()
            .intersection(&other.to_box())
            .filter(|overlap| !overlap.is_empty())
            .map(Self::from_box)
            .unwrap_or_default()
    }

    /// ### English
    /// Scales a DIP rectangle into pixels and returns the enclosing integer rectangle.
    ///
    /// ### 中文
    /// 将 DIP 矩形按缩放因子转换为像素，并返回包围它的整数矩形。
    pub fn to_enclosing_pixels(&self, scale_factor: f32) -> Rect {
        if scale_factor == 1.0 {
            return *self;
        }
        let scale = f64::from(scale_factor);
        let scaled = self.to_box().to_f64().scale(scale, scale).round_out();
        // Float-to-int `as` saturates (NaN becomes 0).
        Self::from_box(Box2D::new(
            Point2D::new(scaled.min.x as i64, scaled.min.y as i64),
            Point2D::new(scaled.max.x as i64, scaled.max.y as i64),
        ))
    }

    /// ### English
    /// Widens to an `i64` box so edge arithmetic cannot overflow.
    ///
    /// ### 中文
    /// 扩展为 `i64` 盒子，边缘运算不会溢出。
    fn to_box(self) -> Box2D<i64> {
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        Box2D::new(
            Point2D::new(x, y),
            Point2D::new(x + i64::from(self.width), y + i64::from(self.height)),
        )
    }

    fn from_box(area: Box2D<i64>) -> Rect {
        let x = saturate_i32(area.min.x);
        let y = saturate_i32(area.min.y);
        Rect::new(
            x,
            y,
            saturate_i32(area.max.x - i64::from(x)),
            saturate_i32(area.max.y - i64::from(y)),
        )
    }
}

/// ### English
/// Scales a DIP size to pixels, rounding each dimension up.
///
/// ### 中文
/// 将 DIP 尺寸按缩放因子换算为像素，每一维向上取整。
pub fn scale_to_ceiled_size(size: LogicalSize<u32>, scale_factor: f32) -> PhysicalSize<u32> {
    if scale_factor == 1.0 {
        return PhysicalSize::new(size.width, size.height);
    }
    let scale = f64::from(scale_factor);
    PhysicalSize::new(
        (f64::from(size.width) * scale).ceil() as u32,
        (f64::from(size.height) * scale).ceil() as u32,
    )
}

#[inline]
fn clamp_u32(value: u32) -> i32 {
    value.min(i32::MAX as u32) as i32
}

#[inline]
fn saturate_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_ignores_empty_operands() {
        let a = Rect::new(10, 10, 5, 5);
        assert_eq!(a.union(&Rect::default()), a);
        assert_eq!(Rect::default().union(&a), a);
        assert_eq!(
            a.union(&Rect::new(0, 0, 2, 2)),
            Rect::new(0, 0, 15, 15)
        );
    }

    #[test]
    fn intersect_clips_to_overlap() {
        let surface = Rect::new(0, 0, 100, 50);
        assert_eq!(
            surface.intersect(&Rect::new(90, 40, 30, 30)),
            Rect::new(90, 40, 10, 10)
        );
        assert!(surface.intersect(&Rect::new(200, 0, 10, 10)).is_empty());
    }

    #[test]
    fn union_of_distant_rects_saturates() {
        let left = Rect::new(-2_000_000_000, 0, 10, 10);
        let right = Rect::new(2_000_000_000, 0, 10, 10);
        let merged = left.union(&right);
        assert_eq!(merged.x, -2_000_000_000);
        assert_eq!(merged.width, i32::MAX);
        assert_eq!(merged.height, 10);
        assert!(right.intersect(&left).is_empty());
    }

    #[test]
    fn edges_near_the_limit_do_not_overflow() {
        let edge = Rect::new(i32::MAX - 5, i32::MAX - 5, 100, 100);
        assert_eq!(
            edge.union(&Rect::new(0, 0, 1, 1)),
            Rect::new(0, 0, i32::MAX, i32::MAX)
        );
        assert_eq!(
            edge.intersect(&Rect::new(i32::MAX - 10, i32::MAX - 10, 8, 8)),
            Rect::new(i32::MAX - 5, i32::MAX - 5, 3, 3)
        );
        let scaled = Rect::new(1_500_000_000, 0, 10, 10).to_enclosing_pixels(2.0);
        assert_eq!(scaled.x, i32::MAX);
    }

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(0, 0, 10, 10);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(9.5, 9.5)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
    }

    #[test]
    fn scaling_rounds_outwards() {
        assert_eq!(
            Rect::new(1, 1, 3, 3).to_enclosing_pixels(1.5),
            Rect::new(1, 1, 5, 5)
        );
        assert_eq!(
            scale_to_ceiled_size(LogicalSize::new(101, 33), 1.5),
            PhysicalSize::new(152, 50)
        );
    }
}
