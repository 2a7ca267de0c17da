//! ### English
//! Mouse routing: proxies first, then the open popup, then the widget itself.
//!
//! ### 中文
//! 鼠标路由：依次命中 proxy、已打开的 popup、widget 本身。

use std::time::Duration;

use super::super::input::{MouseEvent, MouseTarget, MouseWheelEvent, Relocate};
use super::super::render_host::RenderWidgetHost;
use super::tasks::Task;
use super::{OffscreenViewHost, ViewId};

/// ### English
/// Hit-test outcome before forwarding, with the popup that was missed (if any).
///
/// ### 中文
/// 转发前的命中测试结果，以及未被命中的 popup（若有）。
struct Hit<E> {
    target: MouseTarget<E>,
    missed_popup: Option<ViewId>,
}

impl OffscreenViewHost {
    /// ### English
    /// Routes a mouse event (DIP, view coordinates) and forwards it to the render host that
    /// was hit. Proxy hits are only returned.
    ///
    /// ### 中文
    /// 路由鼠标事件（DIP，view 坐标系），并转发给命中的 render host。命中 proxy 时只返回结果。
    pub fn route_mouse_event(&self, id: ViewId, event: MouseEvent) -> MouseTarget<MouseEvent> {
        let hit = self.hit_test(id, event);
        self.forward(&hit.target, |host, event| host.forward_mouse_event(event));
        hit.target
    }

    /// ### English
    /// Routes a mouse wheel event like [`Self::route_mouse_event`]. A wheel outside an open
    /// popup closes that popup on the next task run.
    ///
    /// ### 中文
    /// 与 [`Self::route_mouse_event`] 相同地路由滚轮事件。落在已打开 popup 之外的滚轮会在下一次任务执行时关闭该 popup。
    pub fn route_mouse_wheel(
        &self,
        id: ViewId,
        event: MouseWheelEvent,
    ) -> MouseTarget<MouseWheelEvent> {
        let hit = self.hit_test(id, event);
        if let Some(popup) = hit.missed_popup {
            tracing::debug!(?popup, "wheel outside popup, cancelling it");
            self.post(Task::CancelWidget(popup), Duration::ZERO);
        }
        self.forward(&hit.target, |host, event| host.forward_mouse_wheel_event(event));
        hit.target
    }

    fn hit_test<E: Relocate + Copy>(&self, id: ViewId, event: E) -> Hit<E> {
        let Some(view) = self.views.get(id) else {
            return Hit {
                target: MouseTarget::Dropped,
                missed_popup: None,
            };
        };

        for &proxy in view.proxies.iter().rev() {
            if let Some(entry) = self.proxies.get(proxy)
                && entry.bounds.contains(event.position())
            {
                return Hit {
                    target: MouseTarget::Proxy {
                        proxy,
                        event: event.relative_to(&entry.bounds),
                    },
                    missed_popup: None,
                };
            }
        }

        let mut missed_popup = None;
        if !view.is_popup()
            && let Some(popup) = view.popup
            && let Some(popup_view) = self.views.get(popup)
        {
            if popup_view.popup_position.contains(event.position()) {
                return Hit {
                    target: MouseTarget::Popup {
                        view: popup,
                        event: event.relative_to(&popup_view.popup_position),
                    },
                    missed_popup: None,
                };
            }
            missed_popup = Some(popup);
        }

        Hit {
            target: MouseTarget::Widget { view: id, event },
            missed_popup,
        }
    }

    fn forward<E>(&self, target: &MouseTarget<E>, send: impl FnOnce(&dyn RenderWidgetHost, &E)) {
        let (view, event) = match target {
            MouseTarget::Popup { view, event } | MouseTarget::Widget { view, event } => {
                (*view, event)
            }
            MouseTarget::Proxy { .. } | MouseTarget::Dropped => return,
        };
        if let Some(view) = self.views.get(view) {
            send(view.render_host.as_ref(), event);
        }
    }
}
