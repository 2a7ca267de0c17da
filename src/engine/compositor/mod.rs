//! ### English
//! Software frame compositor: merges a primary bitmap with popup and proxy overlays.
//!
//! ### 中文
//! 软件帧合成器：把主位图与 popup、proxy 覆盖层合并为一帧。
mod bitmap;

use dpi::PhysicalSize;

pub use bitmap::{BYTES_PER_PIXEL, Bitmap};
use bitmap::Canvas;

use crate::engine::geometry::Rect;

/// ### English
/// A bitmap drawn on top of the primary surface at `bounds` (pixels).
///
/// ### 中文
/// 绘制在主表面之上、位于 `bounds`（像素）处的位图。
#[derive(Clone, Copy, Debug)]
pub struct Overlay<'a> {
    pub bitmap: &'a Bitmap,
    pub bounds: Rect,
}

/// ### English
/// Output of [`composite`].
///
/// ### 中文
/// [`composite`] 的输出。
#[derive(Clone, Debug)]
pub struct CompositedFrame {
    pub bitmap: Bitmap,
    pub damage: Rect,
}

/// ### English
/// Combines `primary` with an optional popup and any proxy overlays into one frame.
///
/// - Fast path: without a popup and proxies the primary bitmap is returned as-is (shared, not
///   copied).
/// - Slow path: allocates a `surface_size` buffer, writes the primary bitmap, then the popup (when
///   it draws something) and every proxy. Each overlay's bounds join the damage.
///
/// The damage is always clipped to the surface. When the primary bitmap draws nothing the output
/// stays blank and overlays are skipped.
///
/// ### 中文
/// 将 `primary` 与可选的 popup 以及所有 proxy 覆盖层合成为一帧。
///
/// - 快路径：没有 popup 与 proxy 时直接返回主位图（共享，不复制）。
/// - 慢路径：分配 `surface_size` 大小的缓冲，依次写入主位图、popup（若有内容）以及每个 proxy；
///   每个覆盖层的范围并入 damage。
///
/// damage 总会被裁剪到表面范围内。主位图无内容时输出保持空白，且跳过覆盖层。
pub fn composite(
    primary: &Bitmap,
    damage: Rect,
    surface_size: PhysicalSize<u32>,
    popup: Option<Overlay<'_>>,
    proxies: &[Overlay<'_>],
) -> CompositedFrame {
    let mut damage_union = damage;

    let bitmap = if popup.is_none() && proxies.is_empty() {
        primary.clone()
    } else {
        let mut canvas = Canvas::new(surface_size);
        if !primary.draws_nothing() {
            canvas.write_pixels(primary, 0, 0);

            if let Some(popup) = popup.filter(|p| !p.bitmap.draws_nothing()) {
                damage_union = damage_union.union(&popup.bounds);
                canvas.write_pixels(popup.bitmap, popup.bounds.x, popup.bounds.y);
            }

            for proxy in proxies {
                damage_union = damage_union.union(&proxy.bounds);
                canvas.write_pixels(proxy.bitmap, proxy.bounds.x, proxy.bounds.y);
            }
        }
        canvas.into_bitmap()
    };

    CompositedFrame {
        bitmap,
        damage: Rect::from_size(surface_size).intersect(&damage_union),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const BLUE: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn no_overlays_shares_the_primary_buffer() {
        let primary = Bitmap::filled(PhysicalSize::new(8, 8), WHITE);
        let out = composite(
            &primary,
            Rect::new(1, 1, 2, 2),
            PhysicalSize::new(8, 8),
            None,
            &[],
        );
        assert!(out.bitmap.shares_pixels_with(&primary));
        assert_eq!(out.damage, Rect::new(1, 1, 2, 2));
    }

    #[test]
    fn empty_popup_is_drawn_over_nothing_but_still_copies() {
        let primary = Bitmap::filled(PhysicalSize::new(4, 4), WHITE);
        let empty = Bitmap::empty();
        let out = composite(
            &primary,
            Rect::new(0, 0, 1, 1),
            PhysicalSize::new(4, 4),
            Some(Overlay {
                bitmap: &empty,
                bounds: Rect::new(2, 2, 2, 2),
            }),
            &[],
        );
        assert!(!out.bitmap.shares_pixels_with(&primary));
        assert_eq!(out.damage, Rect::new(0, 0, 1, 1));
        assert_eq!(out.bitmap.pixel(3, 3), Some(WHITE));
    }

    #[test]
    fn damage_is_clipped_to_surface() {
        let primary = Bitmap::filled(PhysicalSize::new(4, 4), WHITE);
        let popup = Bitmap::filled(PhysicalSize::new(4, 4), BLUE);
        let out = composite(
            &primary,
            Rect::new(0, 0, 1, 1),
            PhysicalSize::new(4, 4),
            Some(Overlay {
                bitmap: &popup,
                bounds: Rect::new(2, 2, 4, 4),
            }),
            &[],
        );
        assert_eq!(out.damage, Rect::new(0, 0, 4, 4));
        assert_eq!(out.bitmap.pixel(3, 3), Some(BLUE));
        assert_eq!(out.bitmap.pixel(1, 1), Some(WHITE));
    }
}
