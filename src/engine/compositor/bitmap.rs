use std::fmt;
use std::sync::Arc;

use dpi::PhysicalSize;

use crate::engine::error::{OffscreenError, OffscreenResult};
use crate::engine::geometry::Rect;

/// ### English
/// Bytes per pixel (32-bit BGRA, premultiplied).
///
/// ### 中文
/// 每像素字节数（32 位 BGRA，预乘 alpha）。
pub const BYTES_PER_PIXEL: usize = 4;

/// ### English
/// Immutable CPU pixel buffer shared by reference count.
///
/// Cloning shares the pixels; two clones of one bitmap report [`Bitmap::shares_pixels_with`].
///
/// ### 中文
/// 以引用计数共享的不可变 CPU 像素缓冲。
///
/// clone 共享同一份像素；同一位图的两个 clone 满足 [`Bitmap::shares_pixels_with`]。
#[derive(Clone)]
pub struct Bitmap {
    size: PhysicalSize<u32>,
    pixels: Arc<[u8]>,
}

impl Bitmap {
    /// ### English
    /// Wraps `pixels` (tightly packed rows) as a bitmap of `size`.
    ///
    /// ### 中文
    /// 将 `pixels`（紧密排列的行）包装为尺寸为 `size` 的位图。
    pub fn new(size: PhysicalSize<u32>, pixels: impl Into<Arc<[u8]>>) -> OffscreenResult<Self> {
        let pixels = pixels.into();
        let expected = byte_len(size);
        if pixels.len() != expected {
            return Err(OffscreenError::invalid_argument(format!(
                "bitmap {}x{} needs {expected} bytes, got {}",
                size.width,
                size.height,
                pixels.len()
            )));
        }
        Ok(Self { size, pixels })
    }

    pub fn empty() -> Self {
        Self {
            size: PhysicalSize::new(0, 0),
            pixels: Arc::from(Vec::new()),
        }
    }

    /// ### English
    /// A bitmap where every pixel is `bgra`.
    ///
    /// ### 中文
    /// 所有像素都为 `bgra` 的位图。
    pub fn filled(size: PhysicalSize<u32>, bgra: [u8; 4]) -> Self {
        let pixels: Vec<u8> = bgra
            .iter()
            .copied()
            .cycle()
            .take(byte_len(size))
            .collect();
        Self {
            size,
            pixels: pixels.into(),
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn row_bytes(&self) -> usize {
        self.size.width as usize * BYTES_PER_PIXEL
    }

    /// ### English
    /// Whether drawing this bitmap would produce nothing (zero area).
    ///
    /// ### 中文
    /// 绘制该位图是否不会产生任何内容（面积为 0）。
    pub fn draws_nothing(&self) -> bool {
        self.size.width == 0 || self.size.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let offset = y as usize * self.row_bytes() + x as usize * BYTES_PER_PIXEL;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_PIXEL]);
        Some(out)
    }

    pub fn shares_pixels_with(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.size.width)
            .field("height", &self.size.height)
            .finish()
    }
}

/// ### English
/// Mutable canvas the compositor writes into before freezing it into a [`Bitmap`].
///
/// ### 中文
/// 合成器写入的可变画布，完成后冻结为 [`Bitmap`]。
pub(super) struct Canvas {
    size: PhysicalSize<u32>,
    pixels: Vec<u8>,
}

impl Canvas {
    pub(super) fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            size,
            pixels: vec![0; byte_len(size)],
        }
    }

    /// ### English
    /// Copies `src` with its top-left corner at (`x`, `y`), clipped to the canvas. No blending.
    ///
    /// ### 中文
    /// 将 `src` 的左上角放在 (`x`, `y`) 处复制，并裁剪到画布范围内。不做混合。
    pub(super) fn write_pixels(&mut self, src: &Bitmap, x: i32, y: i32) {
        let dst_rect = Rect::from_size(self.size);
        let placed = Rect::from_size(src.size()).with_origin(x, y);
        let visible = dst_rect.intersect(&placed);
        if visible.is_empty() {
            return;
        }

        let dst_row_bytes = self.size.width as usize * BYTES_PER_PIXEL;
        let src_row_bytes = src.row_bytes();
        let copy_bytes = visible.width as usize * BYTES_PER_PIXEL;
        let src_x = (visible.x - x) as usize;
        let src_y = (visible.y - y) as usize;

        for row in 0..visible.height as usize {
            let src_offset = (src_y + row) * src_row_bytes + src_x * BYTES_PER_PIXEL;
            let dst_offset =
                (visible.y as usize + row) * dst_row_bytes + visible.x as usize * BYTES_PER_PIXEL;
            self.pixels[dst_offset..dst_offset + copy_bytes]
                .copy_from_slice(&src.pixels()[src_offset..src_offset + copy_bytes]);
        }
    }

    pub(super) fn into_bitmap(self) -> Bitmap {
        Bitmap {
            size: self.size,
            pixels: self.pixels.into(),
        }
    }
}

#[inline]
fn byte_len(size: PhysicalSize<u32>) -> usize {
    size.width as usize * size.height as usize * BYTES_PER_PIXEL
}
