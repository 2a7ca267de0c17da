//! ### English
//! Attaching views as popups or children, and tearing views down.
//!
//! ### 中文
//! 把 view 关联为 popup 或 child，以及销毁 view。

use super::super::view::ViewRole;
use super::{OffscreenViewHost, ViewId};
use crate::engine::error::{OffscreenError, OffscreenResult};
use crate::engine::geometry::Rect;
use crate::engine::paint::TexturePaint;

impl OffscreenViewHost {
    /// ### English
    /// Turns a detached view into its parent's popup at `bounds` (DIP, parent coordinates).
    ///
    /// A popup the parent already had is cancelled first. The popup is shown and always paints.
    ///
    /// ### 中文
    /// 把未关联的 view 设为其父 view 位于 `bounds`（DIP，父坐标系）的 popup。
    ///
    /// 父 view 已有的 popup 会先被取消。popup 会被显示，并且始终绘制。
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn init_as_popup(&mut self, id: ViewId, bounds: Rect) -> OffscreenResult<()> {
        let parent = self.detached_parent(id)?;
        if let Some(old) = self.view(parent)?.popup.filter(|&old| old != id) {
            self.cancel_view(old);
        }

        self.view_mut(parent)?.popup = Some(id);
        let view = self.view_mut(id)?;
        view.role = ViewRole::Popup;
        view.popup_position = bounds;

        self.sync_visual_properties(id, None);
        self.show_view(id);
        self.set_painting(id, true)?;
        self.invalidate(id)
    }

    /// ### English
    /// Turns a detached view into its parent's embedded child.
    ///
    /// The parent is hidden while the child is attached and shown again when the child goes away.
    ///
    /// ### 中文
    /// 把未关联的 view 设为其父 view 的内嵌 child。
    ///
    /// child 关联期间父 view 被隐藏；child 移除后父 view 重新显示。
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn init_as_child(&mut self, id: ViewId) -> OffscreenResult<()> {
        let parent = self.detached_parent(id)?;
        if let Some(old) = self.view(parent)?.child.filter(|&old| old != id) {
            self.cancel_view(old);
        }

        let parent_view = self.view_mut(parent)?;
        parent_view.child = Some(id);
        let painting = parent_view.painting;
        self.view_mut(id)?.role = ViewRole::Child;

        self.hide_view(parent);
        self.set_root_layer_size(id, false);
        self.show_view(id);
        self.set_painting(id, painting)
    }

    /// ### English
    /// Closes a popup or child view and removes it from the host.
    ///
    /// ### 中文
    /// 关闭 popup 或 child view，并将其从 host 中移除。
    pub fn cancel_widget(&mut self, id: ViewId) -> OffscreenResult<()> {
        self.view(id)?;
        self.cancel_view(id);
        Ok(())
    }

    /// ### English
    /// Destroys a view. Root views cancel their popup and child, detach their proxies and hide;
    /// views with a parent are cancelled. The id is dead afterwards.
    ///
    /// ### 中文
    /// 销毁 view。根 view 会取消其 popup 与 child、解除 proxy 关联并隐藏；有父 view 的 view 会被取消。
    /// 之后该 id 失效。
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, id: ViewId) -> OffscreenResult<()> {
        let view = self.view_mut(id)?;
        view.is_destroyed = true;

        if view.parent.is_some() {
            self.cancel_view(id);
            return Ok(());
        }

        let (popup, child) = (view.popup, view.child);
        if let Some(popup) = popup {
            self.cancel_view(popup);
        }
        if let Some(child) = child {
            self.cancel_view(child);
        }
        self.hide_view(id);
        self.remove_view(id);
        Ok(())
    }

    /// ### English
    /// The renderer crashed or exited; the view is destroyed.
    ///
    /// ### 中文
    /// 渲染进程崩溃或退出；销毁该 view。
    pub fn render_process_gone(&mut self, id: ViewId) -> OffscreenResult<()> {
        tracing::warn!(?id, "render process gone");
        self.destroy(id)
    }

    pub(super) fn cancel_view(&mut self, id: ViewId) {
        let Some(view) = self.views.get(id) else {
            return;
        };
        view.render_host.lost_capture();
        self.hide_view(id);

        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        let parent = view.parent.take();
        let was_destroyed = std::mem::replace(&mut view.is_destroyed, true);
        let popup_bounds = view.popup_position;
        if !was_destroyed {
            view.render_host.shutdown_widget();
        }

        if let Some(parent_view) = parent.and_then(|parent| self.views.get_mut(parent)) {
            if parent_view.popup == Some(id) {
                parent_view.popup = None;
                parent_view.sink.on_texture_paint(TexturePaint::popup_cleared());
                let scale_factor = parent_view.current_scale_factor;
                parent_view
                    .render_host
                    .invalidate(Some(popup_bounds.to_enclosing_pixels(scale_factor)));
            } else if parent_view.child == Some(id) {
                parent_view.child = None;
                if !parent_view.is_destroyed
                    && let Some(parent) = parent
                {
                    self.show_view(parent);
                }
            }
        }

        tracing::debug!(?id, "widget cancelled");
        self.remove_view(id);
    }

    fn remove_view(&mut self, id: ViewId) {
        let Some(view) = self.views.remove(id) else {
            return;
        };
        for proxy in view.proxies {
            if let Some(proxy) = self.proxies.get_mut(proxy)
                && proxy.observer == Some(id)
            {
                proxy.observer = None;
            }
        }
    }

    fn detached_parent(&self, id: ViewId) -> OffscreenResult<ViewId> {
        let view = self.view(id)?;
        match (view.role, view.parent) {
            (ViewRole::Detached, Some(parent)) if self.contains(parent) => Ok(parent),
            (ViewRole::Detached, _) => Err(OffscreenError::invalid_argument(
                "view has no live parent to attach to",
            )),
            (role, _) => Err(OffscreenError::invalid_argument(format!(
                "view is already attached as {role:?}"
            ))),
        }
    }
}
