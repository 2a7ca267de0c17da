//! ### English
//! Bitflags controlling optional view behaviors.
//!
//! These are passed through the C ABI as a `u32` bitmask.
//!
//! ### 中文
//! 控制 view 可选行为的位标志（bitflags）。
//!
//! 通过 C ABI 以 `u32` 位掩码传入。

/// ### English
/// The view background is transparent. Applied on the first navigation.
///
/// ### 中文
/// view 背景透明。在首次导航时生效。
pub const XIAN_OFFSCREEN_VIEW_FLAG_TRANSPARENT: u32 = 1 << 0;

/// ### English
/// Create the view hidden; it allocates no surface id until shown.
///
/// ### 中文
/// 以隐藏状态创建 view；在显示之前不分配 surface id。
pub const XIAN_OFFSCREEN_VIEW_FLAG_START_HIDDEN: u32 = 1 << 1;

/// ### English
/// Create the view with painting stopped (no begin-frames until painting is turned on).
///
/// ### 中文
/// 以停止绘制的状态创建 view（开启绘制前不发出 begin-frame）。
pub const XIAN_OFFSCREEN_VIEW_FLAG_NOT_PAINTING: u32 = 1 << 2;

pub(crate) const KNOWN_VIEW_FLAGS: u32 = XIAN_OFFSCREEN_VIEW_FLAG_TRANSPARENT
    | XIAN_OFFSCREEN_VIEW_FLAG_START_HIDDEN
    | XIAN_OFFSCREEN_VIEW_FLAG_NOT_PAINTING;

#[inline]
pub(crate) fn has_flag(flags: u32, flag: u32) -> bool {
    flags & flag != 0
}
