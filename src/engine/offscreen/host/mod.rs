//! ### English
//! `OffscreenViewHost`: the single owner of every offscreen view and view proxy on the UI thread.
//!
//! Views refer to each other (parent, popup, child) by [`ViewId`] and resolve those ids through
//! the host, so a torn-down view can never be reached through a stale link. Work that must run
//! later (trailing resizes, popup cancellation, forced redraws) is posted to a task queue drained
//! by [`OffscreenViewHost::run_pending_tasks`]; tasks whose view is gone do nothing.
//!
//! ### 中文
//! `OffscreenViewHost`：UI 线程上所有离屏 view 与 view proxy 的唯一所有者。
//!
//! view 之间（父、popup、child）通过 [`ViewId`] 相互引用，并经由 host 解析，因此无法通过过期链接访问已销毁的
//! view。需要延后执行的工作（尾随 resize、取消 popup、强制重绘）会投递到任务队列，由
//! [`OffscreenViewHost::run_pending_tasks`] 执行；目标 view 已不存在的任务不做任何事。
mod input;
mod lifecycle;
mod paint;
mod proxy;
mod tasks;
mod visibility;

use std::rc::Rc;
use std::time::Instant;

use crossbeam_channel as channel;
use dpi::{LogicalSize, PhysicalSize};
use slotmap::{Key as _, KeyData, SlotMap};

use super::render_host::RenderWidgetHost;
use super::surface_id::LocalSurfaceId;
use super::view::{
    Color, DEFAULT_SCALE_FACTOR, OffscreenView, OffscreenViewInit, ViewRole,
};
use crate::engine::error::{OffscreenError, OffscreenResult};
use crate::engine::paint::PaintInProgress;

pub use proxy::ViewProxy;
pub use tasks::TaskPoster;
use tasks::{PostedTask, Task};

slotmap::new_key_type! {
    /// ### English
    /// Handle to a view owned by an [`OffscreenViewHost`].
    ///
    /// ### 中文
    /// [`OffscreenViewHost`] 所持有 view 的句柄。
    pub struct ViewId;

    /// ### English
    /// Handle to a view proxy owned by an [`OffscreenViewHost`].
    ///
    /// ### 中文
    /// [`OffscreenViewHost`] 所持有 view proxy 的句柄。
    pub struct ProxyId;
}

impl ViewId {
    /// ### English
    /// Opaque non-zero value handed across the C ABI.
    ///
    /// ### 中文
    /// 跨 C ABI 传递的不透明非零值。
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    pub fn from_raw(raw: u64) -> Self {
        KeyData::from_ffi(raw).into()
    }
}

impl ProxyId {
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    pub fn from_raw(raw: u64) -> Self {
        KeyData::from_ffi(raw).into()
    }
}

/// ### English
/// Owning table of offscreen views. Lives on, and is only touched from, the UI thread.
///
/// ### 中文
/// 离屏 view 的所有权表。位于 UI 线程，且只在 UI 线程上访问。
pub struct OffscreenViewHost {
    views: SlotMap<ViewId, OffscreenView>,
    proxies: SlotMap<ProxyId, ViewProxy>,
    /// ### English
    /// Device scale factor of the display, used by views in automatic scale mode.
    ///
    /// ### 中文
    /// 显示器的设备缩放因子，供自动缩放模式的 view 使用。
    display_scale_factor: f32,
    task_tx: channel::Sender<PostedTask>,
    task_rx: channel::Receiver<PostedTask>,
    delayed: Vec<(Instant, Task)>,
}

impl Default for OffscreenViewHost {
    fn default() -> Self {
        Self::new()
    }
}

impl OffscreenViewHost {
    pub fn new() -> Self {
        let (task_tx, task_rx) = channel::unbounded();
        Self {
            views: SlotMap::with_key(),
            proxies: SlotMap::with_key(),
            display_scale_factor: DEFAULT_SCALE_FACTOR,
            task_tx,
            task_rx,
            delayed: Vec::new(),
        }
    }

    /// ### English
    /// Creates a root view.
    ///
    /// Sizes the root layer, shows the view unless `start_hidden`, then synchronizes visual
    /// properties once.
    ///
    /// ### 中文
    /// 创建根 view。
    ///
    /// 先设置根 layer 尺寸，若非 `start_hidden` 则显示 view，然后同步一次视觉属性。
    #[tracing::instrument(level = "debug", skip(self, init), fields(size = ?init.size))]
    pub fn create_view(&mut self, init: OffscreenViewInit) -> ViewId {
        let start_hidden = init.start_hidden;
        let view = OffscreenView::new(init, ViewRole::Root, None);
        let id = self.views.insert(view);

        if let Some(view) = self.views.get(id) {
            view.render_host.set_begin_frames_enabled(view.painting);
        }
        self.set_root_layer_size(id, false);
        if !start_hidden {
            self.show_view(id);
        }
        self.sync_visual_properties(id, None);
        id
    }

    /// ### English
    /// Creates a view for a child widget of `parent` (a popup or an embedded child).
    ///
    /// The new view inherits the parent's sink, transparency, size, painting state, frame rate
    /// and scale factor. It stays detached until [`Self::init_as_popup`] or
    /// [`Self::init_as_child`].
    ///
    /// ### 中文
    /// 为 `parent` 的子 widget（popup 或内嵌 child）创建 view。
    ///
    /// 新 view 继承父 view 的 sink、透明度、尺寸、绘制状态、帧率与缩放因子。在调用
    /// [`Self::init_as_popup`] 或 [`Self::init_as_child`] 之前保持未关联状态。
    pub fn create_child_view(
        &mut self,
        parent: ViewId,
        render_host: Rc<dyn RenderWidgetHost>,
    ) -> OffscreenResult<ViewId> {
        let parent_view = self.view(parent)?;
        let init = OffscreenViewInit {
            size: parent_view.size,
            transparent: parent_view.transparent,
            painting: parent_view.painting,
            frame_rate: parent_view.frame_rate,
            scale_factor: parent_view.manual_scale_factor,
            start_hidden: true,
            render_host,
            sink: parent_view.sink.clone(),
        };
        let mut view = OffscreenView::new(init, ViewRole::Detached, Some(parent));
        view.current_scale_factor = parent_view.current_scale_factor;
        Ok(self.views.insert(view))
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.views.contains_key(id)
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn is_showing(&self, id: ViewId) -> OffscreenResult<bool> {
        Ok(self.view(id)?.is_showing)
    }

    pub fn is_painting(&self, id: ViewId) -> OffscreenResult<bool> {
        Ok(self.view(id)?.painting)
    }

    pub fn role(&self, id: ViewId) -> OffscreenResult<ViewRole> {
        Ok(self.view(id)?.role)
    }

    pub fn parent(&self, id: ViewId) -> OffscreenResult<Option<ViewId>> {
        Ok(self.view(id)?.parent)
    }

    pub fn popup(&self, id: ViewId) -> OffscreenResult<Option<ViewId>> {
        Ok(self.view(id)?.popup)
    }

    pub fn child(&self, id: ViewId) -> OffscreenResult<Option<ViewId>> {
        Ok(self.view(id)?.child)
    }

    pub fn frame_rate(&self, id: ViewId) -> OffscreenResult<u32> {
        Ok(self.view(id)?.frame_rate)
    }

    pub fn size(&self, id: ViewId) -> OffscreenResult<LogicalSize<u32>> {
        Ok(self.view(id)?.size)
    }

    pub fn size_in_pixels(&self, id: ViewId) -> OffscreenResult<PhysicalSize<u32>> {
        Ok(self.view(id)?.size_in_pixels())
    }

    pub fn root_layer_pixel_size(&self, id: ViewId) -> OffscreenResult<PhysicalSize<u32>> {
        Ok(self.view(id)?.root_layer_size)
    }

    pub fn background_color(&self, id: ViewId) -> OffscreenResult<Color> {
        Ok(self.view(id)?.background_color)
    }

    /// ### English
    /// Current local surface id (invalid if never allocated or evicted).
    ///
    /// ### 中文
    /// 当前本地 surface id（从未分配或已被驱逐时无效）。
    pub fn local_surface_id(&self, id: ViewId) -> OffscreenResult<LocalSurfaceId> {
        Ok(self.view(id)?.surface_ids.current())
    }

    /// ### English
    /// Number of local surface ids this view has generated.
    ///
    /// ### 中文
    /// 该 view 已生成的本地 surface id 数量。
    pub fn surface_id_generations(&self, id: ViewId) -> OffscreenResult<u64> {
        Ok(self.view(id)?.surface_ids.generation_count())
    }

    /// ### English
    /// `(hold_resize, pending_resize)`.
    ///
    /// ### 中文
    /// 返回 `(hold_resize, pending_resize)`。
    pub fn resize_state(&self, id: ViewId) -> OffscreenResult<(bool, bool)> {
        let view = self.view(id)?;
        Ok((view.hold_resize, view.pending_resize))
    }

    /// ### English
    /// Flag that is set while this view's paint callback runs.
    ///
    /// ### 中文
    /// 在该 view 的 paint 回调执行期间置位的标记。
    pub fn paint_in_progress(&self, id: ViewId) -> OffscreenResult<PaintInProgress> {
        Ok(self.view(id)?.paint_in_progress.clone())
    }

    fn view(&self, id: ViewId) -> OffscreenResult<&OffscreenView> {
        self.views.get(id).ok_or(OffscreenError::InvalidHandle)
    }

    fn view_mut(&mut self, id: ViewId) -> OffscreenResult<&mut OffscreenView> {
        self.views.get_mut(id).ok_or(OffscreenError::InvalidHandle)
    }
}
