//! ### English
//! Visibility, sizing and surface-id synchronization.
//!
//! A view holds at most one resize in flight: a resize that changes the root layer enters the
//! resize hold, further resizes only mark `pending_resize`, and the frame that reaches the new
//! size releases the hold and schedules exactly one trailing resize.
//!
//! ### 中文
//! 可见性、尺寸与 surface id 同步。
//!
//! 每个 view 同时至多一个 resize 在途：改变根 layer 的 resize 进入 resize hold，之后的 resize 只标记
//! `pending_resize`；达到新尺寸的帧释放 hold，并安排恰好一次尾随 resize。

use std::time::Duration;

use dpi::LogicalSize;

use super::super::surface_id::LocalSurfaceId;
use super::super::view::clamp_frame_rate;
use super::tasks::Task;
use super::{OffscreenViewHost, ViewId};
use crate::engine::error::{OffscreenError, OffscreenResult};
use crate::engine::geometry::Rect;

impl OffscreenViewHost {
    /// ### English
    /// Shows the view. If its surface id is invalid (never embedded or evicted), a new one is
    /// allocated and visual properties are synchronized.
    ///
    /// ### 中文
    /// 显示 view。若其 surface id 无效（从未嵌入或已被驱逐），会分配新 id 并同步视觉属性。
    pub fn show(&mut self, id: ViewId) -> OffscreenResult<()> {
        self.view(id)?;
        self.show_view(id);
        Ok(())
    }

    /// ### English
    /// Hides the view. The surface id is kept so an unchanged view can be shown again cheaply.
    ///
    /// ### 中文
    /// 隐藏 view。保留 surface id，未变化的 view 可以低成本地重新显示。
    pub fn hide(&mut self, id: ViewId) -> OffscreenResult<()> {
        self.view(id)?;
        self.hide_view(id);
        Ok(())
    }

    /// ### English
    /// Sets the view size (DIP). Popups only move their bounds' size and resynchronize.
    ///
    /// ### 中文
    /// 设置 view 尺寸（DIP）。popup 只修改其边界尺寸并重新同步。
    pub fn set_size(&mut self, id: ViewId, size: LogicalSize<u32>) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        if view.is_popup() {
            view.popup_position = Rect::new(
                view.popup_position.x,
                view.popup_position.y,
                size.width.min(i32::MAX as u32) as i32,
                size.height.min(i32::MAX as u32) as i32,
            );
            self.sync_visual_properties(id, None);
        } else {
            view.size = size;
            self.resized(id);
        }
        Ok(())
    }

    /// ### English
    /// Sets the view bounds (DIP). Only popups use the origin.
    ///
    /// ### 中文
    /// 设置 view 边界（DIP）。只有 popup 会使用原点。
    pub fn set_bounds(&mut self, id: ViewId, bounds: Rect) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        if view.is_popup() {
            view.popup_position = bounds;
            self.sync_visual_properties(id, None);
            Ok(())
        } else {
            self.set_size(id, bounds.logical_size())
        }
    }

    /// ### English
    /// Notifies the view that its size inputs changed.
    ///
    /// While a resize is held this only records a pending resize. While hidden it evicts the
    /// surface id so the next `show` allocates a fresh one.
    ///
    /// ### 中文
    /// 通知 view 其尺寸输入已变化。
    ///
    /// resize hold 期间只记录 pending resize；隐藏期间会驱逐 surface id，下次 `show` 时分配新 id。
    pub fn was_resized(&mut self, id: ViewId) -> OffscreenResult<()> {
        self.view(id)?;
        self.resized(id);
        Ok(())
    }

    /// ### English
    /// Allocates and embeds a new surface id if the root layer was resized or the current id is
    /// invalid. Otherwise does nothing. Returns whether a new id was embedded.
    ///
    /// ### 中文
    /// 若根 layer 尺寸变化或当前 id 无效，则分配并嵌入新的 surface id；否则不做任何事。返回是否嵌入了新 id。
    pub fn synchronize_visual_properties(&mut self, id: ViewId) -> OffscreenResult<bool> {
        self.view(id)?;
        Ok(self.sync_visual_properties(id, None))
    }

    /// ### English
    /// Called after each navigation commit.
    ///
    /// Hidden views only evict their surface id. The first navigation of a shown view applies
    /// transparency and re-embeds the existing id; later navigations synchronize normally.
    ///
    /// ### 中文
    /// 每次导航提交后调用。
    ///
    /// 隐藏的 view 只驱逐 surface id。可见 view 的首次导航会应用透明度并重新嵌入现有 id；之后的导航正常同步。
    pub fn did_navigate(&mut self, id: ViewId) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        if !view.is_showing {
            view.surface_ids.invalidate();
        } else if view.is_first_navigation {
            let current = view.surface_ids.get_or_create();
            self.install_transparency(id)?;
            self.sync_visual_properties(id, Some(current));
        } else {
            self.sync_visual_properties(id, None);
        }
        self.view_mut(id)?.is_first_navigation = false;
        Ok(())
    }

    pub fn invalidate_local_surface_id(&mut self, id: ViewId) -> OffscreenResult<()> {
        self.view_mut(id)?.surface_ids.invalidate();
        tracing::debug!(?id, "local surface id invalidated");
        Ok(())
    }

    /// ### English
    /// The renderer finished applying visual properties and reported its surface id.
    ///
    /// Hidden views only adopt the child's id (or allocate one when none was reported); shown
    /// views synchronize against it.
    ///
    /// ### 中文
    /// 渲染器已应用视觉属性并上报其 surface id。
    ///
    /// 隐藏的 view 只采纳 child 的 id（未上报时分配新 id）；可见 view 以其为基准进行同步。
    pub fn on_did_update_visual_properties_complete(
        &mut self,
        id: ViewId,
        child_surface_id: Option<LocalSurfaceId>,
    ) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        if !view.is_showing {
            match child_surface_id {
                Some(child) => {
                    view.surface_ids.update_from_child(child);
                }
                None => {
                    view.surface_ids.generate_id();
                }
            }
        } else {
            self.sync_visual_properties(id, child_surface_id);
        }
        Ok(())
    }

    /// ### English
    /// Sets the frame rate (clamped to `1..=240`). Child views follow their parent's rate.
    ///
    /// ### 中文
    /// 设置帧率（钳制到 `1..=240`）。子 view 跟随父 view 的帧率。
    pub fn set_frame_rate(&mut self, id: ViewId, frame_rate: i32) -> OffscreenResult<()> {
        let parent_rate = match self.view(id)?.parent {
            Some(parent) => Some(self.view(parent)?.frame_rate),
            None => None,
        };
        let view = self.view_mut(id)?;
        match parent_rate {
            Some(rate) if rate == view.frame_rate => return Ok(()),
            Some(rate) => view.frame_rate = rate,
            None => view.frame_rate = clamp_frame_rate(frame_rate),
        }
        self.setup_frame_rate(id);
        Ok(())
    }

    /// ### English
    /// Sets a manual scale factor; [`AUTO_SCALE_FACTOR`](super::super::view::AUTO_SCALE_FACTOR)
    /// switches back to following the display.
    ///
    /// ### 中文
    /// 设置手动缩放因子；[`AUTO_SCALE_FACTOR`](super::super::view::AUTO_SCALE_FACTOR) 表示恢复跟随显示器。
    pub fn set_manual_scale_factor(&mut self, id: ViewId, scale_factor: f32) -> OffscreenResult<()> {
        if !scale_factor.is_finite() || scale_factor < 0.0 {
            return Err(OffscreenError::invalid_argument(format!(
                "scale factor {scale_factor} is not a non-negative number"
            )));
        }
        self.view_mut(id)?.manual_scale_factor = scale_factor;
        self.sync_visual_properties(id, None);
        Ok(())
    }

    /// ### English
    /// Updates the display's device scale factor and resynchronizes views that follow it.
    ///
    /// ### 中文
    /// 更新显示器的设备缩放因子，并重新同步跟随它的 view。
    pub fn set_display_scale_factor(&mut self, scale_factor: f32) -> OffscreenResult<()> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(OffscreenError::invalid_argument(format!(
                "display scale factor {scale_factor} must be positive"
            )));
        }
        if self.display_scale_factor == scale_factor {
            return Ok(());
        }
        self.display_scale_factor = scale_factor;
        let following: Vec<ViewId> = self
            .views
            .iter()
            .filter(|(_, view)| view.using_auto_scale_factor())
            .map(|(id, _)| id)
            .collect();
        for id in following {
            self.resized(id);
        }
        Ok(())
    }

    /// ### English
    /// Effective scale factor: the manual value, or the device scale factor in automatic mode.
    ///
    /// ### 中文
    /// 生效的缩放因子：手动值，或自动模式下的设备缩放因子。
    pub fn scale_factor(&self, id: ViewId) -> OffscreenResult<f32> {
        Ok(self.view(id)?.scale_factor())
    }

    pub(super) fn show_view(&mut self, id: ViewId) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        if view.is_showing {
            return;
        }
        view.is_showing = true;
        tracing::debug!(?id, "view shown");

        if !view.surface_ids.get_or_create().is_valid() {
            self.sync_visual_properties(id, None);
        }
        if let Some(view) = self.views.get(id) {
            view.render_host.was_shown();
        }
    }

    pub(super) fn hide_view(&mut self, id: ViewId) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        if !view.is_showing {
            return;
        }
        view.render_host.was_hidden();
        view.is_showing = false;
        tracing::debug!(?id, "view hidden");
    }

    pub(super) fn resized(&mut self, id: ViewId) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        if view.hold_resize {
            if !view.pending_resize {
                view.pending_resize = true;
                tracing::trace!(?id, "resize deferred until hold is released");
            }
            return;
        }
        if !view.is_showing {
            view.surface_ids.invalidate();
            return;
        }
        self.sync_visual_properties(id, None);
    }

    /// ### English
    /// Core of visual-property synchronization; see [`Self::synchronize_visual_properties`].
    ///
    /// `child_surface_id` is the id last reported by the renderer; it is adopted when the root
    /// layer did not change.
    ///
    /// ### 中文
    /// 视觉属性同步的核心实现；参见 [`Self::synchronize_visual_properties`]。
    ///
    /// `child_surface_id` 为渲染器最近上报的 id；根 layer 未变化时会采纳它。
    pub(super) fn sync_visual_properties(
        &mut self,
        id: ViewId,
        child_surface_id: Option<LocalSurfaceId>,
    ) -> bool {
        if !self.views.contains_key(id) {
            return false;
        }
        self.setup_frame_rate(id);
        let resized = self.resize_root_layer(id);

        let Some(view) = self.views.get_mut(id) else {
            return false;
        };
        let mut surface_id_updated = false;
        if !resized && let Some(child) = child_surface_id {
            view.surface_ids.update_from_child(child);
            surface_id_updated = true;
        }
        if resized || !view.surface_ids.get_or_create().is_valid() {
            view.surface_ids.generate_id();
            surface_id_updated = true;
        }

        if surface_id_updated {
            let surface_id = view.surface_ids.current();
            tracing::debug!(?id, ?surface_id, resized, "embedding surface");
            view.render_host
                .embed_surface(surface_id, view.size_in_pixels());
            view.render_host.synchronize_visual_properties();
        }
        surface_id_updated
    }

    /// ### English
    /// Applies the current size to the root layer unless a resize is held.
    ///
    /// Returns `true` (and enters the hold) only when the root layer actually changed.
    ///
    /// ### 中文
    /// 若未处于 resize hold，则把当前尺寸应用到根 layer。
    ///
    /// 仅当根 layer 实际变化时返回 `true`（并进入 hold）。
    fn resize_root_layer(&mut self, id: ViewId) -> bool {
        let Some(view) = self.views.get(id) else {
            return false;
        };
        if !view.hold_resize {
            if self.set_root_layer_size(id, false) {
                if let Some(view) = self.views.get_mut(id) {
                    view.hold_resize = true;
                    tracing::trace!(?id, size = ?view.root_layer_size, "resize hold entered");
                }
                return true;
            }
        } else if !view.pending_resize
            && let Some(view) = self.views.get_mut(id)
        {
            view.pending_resize = true;
        }
        false
    }

    /// ### English
    /// Recomputes the scale factor and root layer size. Returns whether either changed.
    ///
    /// ### 中文
    /// 重新计算缩放因子与根 layer 尺寸。返回二者是否有变化。
    pub(super) fn set_root_layer_size(&mut self, id: ViewId, force: bool) -> bool {
        let display_scale_factor = self.display_scale_factor;
        let Some(view) = self.views.get_mut(id) else {
            return false;
        };
        let scale_factor = if view.using_auto_scale_factor() {
            display_scale_factor
        } else {
            view.manual_scale_factor
        };
        view.current_scale_factor = scale_factor;

        let size = view.size_in_pixels();
        let scale_factor_changed = scale_factor != view.root_layer_scale;
        let bounds_changed = size != view.root_layer_size;
        if !force && !scale_factor_changed && !bounds_changed {
            return false;
        }
        view.root_layer_size = size;
        view.root_layer_scale = scale_factor;
        scale_factor_changed || bounds_changed
    }

    /// ### English
    /// Leaves the resize hold; a resize that arrived meanwhile is replayed asynchronously.
    ///
    /// ### 中文
    /// 退出 resize hold；期间到达的 resize 会被异步重放。
    pub(super) fn release_resize_hold(&mut self, id: ViewId) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        debug_assert!(view.hold_resize);
        view.hold_resize = false;
        tracing::trace!(?id, "resize hold released");
        if view.pending_resize {
            view.pending_resize = false;
            self.post(Task::WasResized(id), Duration::ZERO);
        }
    }

    fn setup_frame_rate(&mut self, id: ViewId) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        if view.applied_frame_rate == Some(view.frame_rate) {
            return;
        }
        view.applied_frame_rate = Some(view.frame_rate);
        view.render_host
            .set_vsync_interval(Duration::from_secs(1) / view.frame_rate);
    }
}
