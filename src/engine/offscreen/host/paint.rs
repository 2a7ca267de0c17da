//! ### English
//! Painting state and frame delivery for views.
//!
//! ### 中文
//! view 的绘制状态与帧交付。

use std::time::Duration;

use super::super::view::{Color, FORCE_RENDER_FRAMES, FORCE_RENDER_INTERVAL};
use super::tasks::Task;
use super::{OffscreenViewHost, ViewId};
use crate::engine::compositor::{Bitmap, Overlay, composite};
use crate::engine::error::{OffscreenError, OffscreenResult};
use crate::engine::geometry::Rect;
use crate::engine::paint::TexturePaint;

impl OffscreenViewHost {
    /// ### English
    /// Starts or stops frame production. The popup follows its parent; turning painting on
    /// requests a full redraw.
    ///
    /// ### 中文
    /// 开始或停止出帧。popup 跟随父 view；开启绘制时会请求一次全量重绘。
    pub fn set_painting(&mut self, id: ViewId, painting: bool) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        view.painting = painting;
        let popup = view.popup;
        view.render_host.set_begin_frames_enabled(painting);
        tracing::debug!(?id, painting, "painting changed");

        if let Some(popup) = popup
            && self.contains(popup)
        {
            self.set_painting(popup, painting)?;
        }
        if painting {
            self.invalidate(id)?;
        }
        Ok(())
    }

    pub fn set_background_color(&mut self, id: ViewId, color: Color) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        if view.background_color != color {
            view.background_color = color;
            view.render_host.set_background_color(color);
        }
        Ok(())
    }

    /// ### English
    /// Applies a transparent background if the view was created transparent.
    ///
    /// ### 中文
    /// 若 view 创建时为透明，则应用透明背景。
    pub fn install_transparency(&mut self, id: ViewId) -> OffscreenResult<()> {
        if self.view(id)?.transparent {
            self.set_background_color(id, Color::TRANSPARENT)?;
        }
        Ok(())
    }

    /// ### English
    /// Requests a full redraw.
    ///
    /// ### 中文
    /// 请求全量重绘。
    pub fn invalidate(&mut self, id: ViewId) -> OffscreenResult<()> {
        self.view(id)?.render_host.invalidate(None);
        Ok(())
    }

    /// ### English
    /// A software frame arrived for the view. `damage` is in pixels.
    ///
    /// The frame is kept as the view's backing bitmap. A popup repaints its parent; any other
    /// view composites its popup and proxies on top and hands the result to its sink. A frame
    /// whose size equals the root layer size releases the resize hold.
    ///
    /// ### 中文
    /// view 收到一帧软件位图。`damage` 以像素为单位。
    ///
    /// 该帧被保存为 view 的后备位图。popup 会触发父 view 重绘；其他 view 把 popup 与 proxy 叠加其上后
    /// 交给 sink。尺寸等于根 layer 尺寸的帧会释放 resize hold。
    pub fn on_paint(&mut self, id: ViewId, damage: Rect, bitmap: Bitmap) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        if !view.painting {
            tracing::trace!(?id, "frame dropped, view is not painting");
            return Ok(());
        }
        let releases_hold = view.hold_resize && bitmap.size() == view.root_layer_size;
        view.backing = bitmap;
        let (is_popup, parent) = (view.is_popup(), view.parent);

        if releases_hold {
            self.release_resize_hold(id);
        }

        if is_popup {
            match parent.filter(|&parent| self.contains(parent)) {
                Some(parent) => self.on_popup_paint(parent, id),
                None => self.view_mut(id)?.backing = Bitmap::empty(),
            }
            return Ok(());
        }
        self.composite_frame(id, damage);
        Ok(())
    }

    /// ### English
    /// A GPU frame arrived for the view and is handed to the sink, which then owns its release.
    ///
    /// Popup frames go to the parent's sink flagged as popups. Frames that cannot be delivered
    /// are released at once with the empty sync token. Only a frame whose `content_rect` size
    /// equals the root layer size releases the resize hold.
    ///
    /// ### 中文
    /// view 收到一帧 GPU 帧并交给 sink，此后由 sink 负责释放。
    ///
    /// popup 帧会标记为 popup 后交给父 view 的 sink。无法交付的帧会立即以空 sync token 释放。
    /// 只有 `content_rect` 尺寸等于根 layer 尺寸的帧才会释放 resize hold。
    pub fn on_texture_paint(&mut self, id: ViewId, mut frame: TexturePaint) -> OffscreenResult<()> {
        let Some(view) = self.views.get(id) else {
            frame.release.release_unused();
            return Err(OffscreenError::InvalidHandle);
        };
        if !view.painting {
            frame.release.release_unused();
            return Ok(());
        }

        if view.hold_resize && frame.content_rect.size() == view.root_layer_size {
            self.release_resize_hold(id);
        }

        let Some(view) = self.views.get(id) else {
            frame.release.release_unused();
            return Ok(());
        };
        if view.is_popup() {
            frame.is_popup = true;
            match view.parent.and_then(|parent| self.views.get(parent)) {
                Some(parent) => {
                    let sink = parent.sink.clone();
                    parent.paint_in_progress.run(|| sink.on_texture_paint(frame));
                }
                None => frame.release.release_unused(),
            }
            return Ok(());
        }

        let sink = view.sink.clone();
        view.paint_in_progress.run(|| sink.on_texture_paint(frame));
        Ok(())
    }

    /// ### English
    /// The embedder recreated the view's backing texture; forces a burst of redraws so the new
    /// texture gets content even when the page is idle.
    ///
    /// ### 中文
    /// 宿主重新创建了 view 的后备纹理；强制一轮重绘，使页面空闲时新纹理也能获得内容。
    pub fn on_backing_texture_created(&mut self, id: ViewId) -> OffscreenResult<()> {
        self.view(id)?;
        self.force_render_frames(id, FORCE_RENDER_FRAMES, FORCE_RENDER_INTERVAL);
        Ok(())
    }

    pub(super) fn force_render_frames(&mut self, id: ViewId, remaining: u32, delay: Duration) {
        if remaining == 0 {
            return;
        }
        let Some(view) = self.views.get(id) else {
            return;
        };
        view.render_host.invalidate(None);
        if remaining > 1 {
            self.post(
                Task::ForceRenderFrames {
                    view: id,
                    remaining: remaining - 1,
                    delay,
                },
                delay,
            );
        }
    }

    fn on_popup_paint(&mut self, parent: ViewId, popup: ViewId) {
        let Some(popup_view) = self.views.get(popup) else {
            return;
        };
        let Some(parent_view) = self.views.get(parent) else {
            return;
        };
        let damage = popup_view
            .popup_position
            .to_enclosing_pixels(parent_view.current_scale_factor);
        self.composite_frame(parent, damage);
    }

    /// ### English
    /// Composites the view's backing bitmap with its popup and proxies and delivers the result.
    /// `damage` is in pixels.
    ///
    /// ### 中文
    /// 将 view 的后备位图与其 popup、proxy 合成并交付结果。`damage` 以像素为单位。
    pub(super) fn composite_frame(&self, id: ViewId, damage: Rect) {
        let Some(view) = self.views.get(id) else {
            return;
        };
        if !view.painting {
            return;
        }

        let popup = view
            .popup
            .and_then(|popup| self.views.get(popup))
            .map(|popup| Overlay {
                bitmap: &popup.backing,
                bounds: popup
                    .popup_position
                    .to_enclosing_pixels(view.current_scale_factor),
            });
        let proxies: Vec<Overlay<'_>> = view
            .proxies
            .iter()
            .filter_map(|proxy| self.proxies.get(*proxy))
            .map(|proxy| Overlay {
                bitmap: &proxy.bitmap,
                bounds: proxy.pixel_bounds(),
            })
            .collect();

        let frame = composite(&view.backing, damage, view.root_layer_size, popup, &proxies);
        let sink = view.sink.clone();
        view.paint_in_progress
            .run(|| sink.on_paint(frame.damage, &frame.bitmap));
    }
}
