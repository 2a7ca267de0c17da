/// ### English
/// Engine internal modules (GPU synchronization, frame delivery, offscreen views).
///
/// ### 中文
/// 引擎内部模块（GPU 同步、帧交付、离屏 view 等）。
pub mod canvas;
pub mod compositor;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod gpu;
pub(crate) mod lockfree;
pub mod offscreen;
pub mod paint;
