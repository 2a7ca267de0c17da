//! ### English
//! View proxies: embedder-rendered bitmaps composited on top of a view.
//!
//! ### 中文
//! view proxy：由宿主渲染、叠加合成在 view 之上的位图。

use super::{OffscreenViewHost, ProxyId, ViewId};
use crate::engine::compositor::Bitmap;
use crate::engine::error::{OffscreenError, OffscreenResult};
use crate::engine::geometry::{Rect, scale_to_ceiled_size};

/// ### English
/// A proxied region of a view: bounds in DIP, the proxy's own scale factor and its last bitmap.
///
/// ### 中文
/// view 中的一个代理区域：DIP 边界、proxy 自身的缩放因子，以及最近一次的位图。
#[derive(Debug)]
pub struct ViewProxy {
    pub(super) bounds: Rect,
    pub(super) scale_factor: f32,
    pub(super) bitmap: Bitmap,
    pub(super) observer: Option<ViewId>,
}

impl ViewProxy {
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn observer(&self) -> Option<ViewId> {
        self.observer
    }

    /// ### English
    /// Pixel size a bitmap must have to be accepted.
    ///
    /// ### 中文
    /// 位图被接受所需的像素尺寸。
    pub fn expected_bitmap_size(&self) -> dpi::PhysicalSize<u32> {
        scale_to_ceiled_size(self.bounds.logical_size(), self.scale_factor)
    }

    pub(super) fn pixel_bounds(&self) -> Rect {
        self.bounds.to_enclosing_pixels(self.scale_factor)
    }
}

impl OffscreenViewHost {
    pub fn create_view_proxy(&mut self, bounds: Rect, scale_factor: f32) -> OffscreenResult<ProxyId> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(OffscreenError::invalid_argument(format!(
                "proxy scale factor {scale_factor} must be positive"
            )));
        }
        let proxy = ViewProxy {
            bounds,
            scale_factor,
            bitmap: Bitmap::empty(),
            observer: None,
        };
        Ok(self.proxies.insert(proxy))
    }

    pub fn view_proxy(&self, proxy: ProxyId) -> OffscreenResult<&ViewProxy> {
        self.proxies.get(proxy).ok_or(OffscreenError::InvalidHandle)
    }

    /// ### English
    /// Attaches `proxy` to `view`. A proxy observes at most one view; attaching it elsewhere
    /// detaches it from (and repaints) the previous one.
    ///
    /// ### 中文
    /// 把 `proxy` 关联到 `view`。一个 proxy 至多观察一个 view；关联到别处时会从之前的 view 解除（并使其重绘）。
    pub fn add_view_proxy(&mut self, view: ViewId, proxy: ProxyId) -> OffscreenResult<()> {
        self.view(view)?;
        let previous = self.view_proxy(proxy)?.observer;
        if previous == Some(view) {
            return Ok(());
        }
        if let Some(previous) = previous {
            self.detach_proxy(previous, proxy);
        }

        if let Some(entry) = self.proxies.get_mut(proxy) {
            entry.observer = Some(view);
        }
        self.view_mut(view)?.proxies.push(proxy);
        self.repaint_proxy_area(view, proxy, None);
        Ok(())
    }

    pub fn remove_view_proxy(&mut self, view: ViewId, proxy: ProxyId) -> OffscreenResult<()> {
        self.view(view)?;
        if self.view_proxy(proxy)?.observer != Some(view) {
            return Err(OffscreenError::not_found("proxy is not attached to this view"));
        }
        self.detach_proxy(view, proxy);
        Ok(())
    }

    /// ### English
    /// Replaces the proxy's bitmap and repaints the view it is attached to. Returns `false` (and
    /// keeps the old bitmap) when the proxy is not attached to a view or the size does not match
    /// [`ViewProxy::expected_bitmap_size`].
    ///
    /// ### 中文
    /// 替换 proxy 的位图并重绘其关联的 view。proxy 未关联 view 或尺寸与
    /// [`ViewProxy::expected_bitmap_size`] 不符时返回 `false`（并保留旧位图）。
    pub fn set_proxy_bitmap(&mut self, proxy: ProxyId, bitmap: Bitmap) -> OffscreenResult<bool> {
        let entry = self
            .proxies
            .get_mut(proxy)
            .ok_or(OffscreenError::InvalidHandle)?;
        let Some(view) = entry.observer else {
            tracing::debug!(?proxy, "proxy bitmap ignored, no view attached");
            return Ok(false);
        };
        if bitmap.size() != entry.expected_bitmap_size() {
            tracing::debug!(
                ?proxy,
                got = ?bitmap.size(),
                expected = ?entry.expected_bitmap_size(),
                "proxy bitmap rejected"
            );
            return Ok(false);
        }
        entry.bitmap = bitmap;
        self.repaint_proxy_area(view, proxy, None);
        Ok(true)
    }

    pub fn set_proxy_bounds(&mut self, proxy: ProxyId, bounds: Rect) -> OffscreenResult<()> {
        let entry = self
            .proxies
            .get_mut(proxy)
            .ok_or(OffscreenError::InvalidHandle)?;
        if entry.bounds == bounds {
            return Ok(());
        }
        let old = entry.pixel_bounds();
        entry.bounds = bounds;
        if let Some(view) = entry.observer {
            self.repaint_proxy_area(view, proxy, Some(old));
        }
        Ok(())
    }

    pub fn destroy_view_proxy(&mut self, proxy: ProxyId) -> OffscreenResult<()> {
        let observer = self.view_proxy(proxy)?.observer;
        if let Some(view) = observer {
            self.detach_proxy(view, proxy);
        }
        self.proxies.remove(proxy);
        Ok(())
    }

    fn detach_proxy(&mut self, view: ViewId, proxy: ProxyId) {
        if let Some(entry) = self.proxies.get_mut(proxy) {
            entry.observer = None;
        }
        let Some(view_state) = self.views.get_mut(view) else {
            return;
        };
        view_state.proxies.retain(|&p| p != proxy);
        let full = Rect::from_size(view_state.root_layer_size);
        self.composite_frame(view, full);
    }

    fn repaint_proxy_area(&self, view: ViewId, proxy: ProxyId, previous: Option<Rect>) {
        let Some(entry) = self.proxies.get(proxy) else {
            return;
        };
        let damage = match previous {
            Some(previous) => entry.pixel_bounds().union(&previous),
            None => entry.pixel_bounds(),
        };
        self.composite_frame(view, damage);
    }
}
