mod common;

use std::rc::Rc;
use std::time::Instant;

use common::{HostCall, RecordingHost, TestView, create_view, frame_for};
use dpi::LogicalSize;
use xian_offscreen::engine::error::OffscreenError;
use xian_offscreen::engine::geometry::{Point, Rect};
use xian_offscreen::engine::offscreen::{
    FORCE_RENDER_INTERVAL, MouseWheelEvent, OffscreenViewHost, ViewId,
};

const WHITE: [u8; 4] = [255, 255, 255, 255];

fn open_popup(views: &mut OffscreenViewHost, parent: &TestView) -> (ViewId, Rc<RecordingHost>) {
    let popup_host = RecordingHost::new();
    let popup = views
        .create_child_view(parent.id, popup_host.clone())
        .unwrap();
    views.init_as_popup(popup, Rect::new(10, 10, 30, 20)).unwrap();
    (popup, popup_host)
}

fn wheel_at(x: f32, y: f32) -> MouseWheelEvent {
    MouseWheelEvent {
        position: Point::new(x, y),
        delta_x: 0.0,
        delta_y: -120.0,
        modifiers: 0,
    }
}

#[test]
fn stale_view_id_stays_dead_after_its_slot_is_reused() {
    common::init_tracing();
    let mut views = OffscreenViewHost::new();
    let first = create_view(&mut views, 10, 10);
    views.destroy(first.id).unwrap();

    let second = create_view(&mut views, 10, 10);
    assert_ne!(first.id, second.id);
    assert!(!views.contains(first.id));
    assert!(matches!(views.is_showing(first.id), Err(OffscreenError::InvalidHandle)));
    assert!(matches!(views.destroy(first.id), Err(OffscreenError::InvalidHandle)));
    assert!(views.is_showing(second.id).unwrap());
    assert_eq!(views.view_count(), 1);

    assert_ne!(first.id.to_raw(), 0);
    assert_ne!(second.id.to_raw(), first.id.to_raw());
    assert_eq!(ViewId::from_raw(second.id.to_raw()), second.id);
    assert!(!views.contains(ViewId::from_raw(first.id.to_raw())));
}

#[test]
fn trailing_resize_for_a_destroyed_view_does_nothing() {
    let mut views = OffscreenViewHost::new();
    let view = create_view(&mut views, 100, 50);
    views.set_size(view.id, LogicalSize::new(200, 100)).unwrap();
    views.set_size(view.id, LogicalSize::new(300, 150)).unwrap();
    views
        .on_paint(view.id, Rect::new(0, 0, 200, 100), frame_for(&views, view.id, WHITE))
        .unwrap();
    assert_eq!(views.pending_task_count(), 1);

    let poster = views.task_poster();
    assert!(poster.post_resize(view.id));
    views.destroy(view.id).unwrap();
    view.host.take();
    let paints = view.sink.paints.borrow().len();

    assert_eq!(views.run_pending_tasks(Instant::now()), 2);
    assert!(view.host.take().is_empty());
    assert_eq!(view.sink.paints.borrow().len(), paints);
    assert!(view.sink.textures.borrow().is_empty());
    assert_eq!(views.pending_task_count(), 0);
}

#[test]
fn forced_redraws_stop_once_the_view_is_destroyed() {
    let mut views = OffscreenViewHost::new();
    let view = create_view(&mut views, 10, 10);
    views.on_backing_texture_created(view.id).unwrap();
    assert_eq!(views.pending_task_count(), 1);

    views.destroy(view.id).unwrap();
    view.host.take();

    let later = Instant::now() + FORCE_RENDER_INTERVAL;
    assert_eq!(views.run_pending_tasks(later), 1);
    assert_eq!(views.run_pending_tasks(later + FORCE_RENDER_INTERVAL * 4), 0);
    assert!(view.host.take().is_empty());
    assert!(view.sink.paints.borrow().is_empty());
    assert_eq!(views.pending_task_count(), 0);
}

#[test]
fn popup_cancel_after_the_popup_is_gone_does_nothing() {
    let mut views = OffscreenViewHost::new();
    let parent = create_view(&mut views, 100, 50);
    let (popup, popup_host) = open_popup(&mut views, &parent);
    views.route_mouse_wheel(parent.id, wheel_at(90.0, 45.0));
    assert_eq!(views.pending_task_count(), 1);

    views.destroy(popup).unwrap();
    assert!(!views.contains(popup));
    parent.host.take();
    popup_host.take();
    let cleared = parent.sink.textures.borrow().len();

    assert_eq!(views.run_pending_tasks(Instant::now()), 1);
    assert!(popup_host.take().is_empty());
    assert!(parent.host.take().is_empty());
    assert_eq!(parent.sink.textures.borrow().len(), cleared);
    assert!(views.contains(parent.id));
}

#[test]
fn popup_cancel_after_the_parent_is_destroyed_does_nothing() {
    let mut views = OffscreenViewHost::new();
    let parent = create_view(&mut views, 100, 50);
    let (popup, popup_host) = open_popup(&mut views, &parent);
    views.route_mouse_wheel(parent.id, wheel_at(90.0, 45.0));

    views.destroy(parent.id).unwrap();
    assert_eq!(popup_host.count(|c| *c == HostCall::Shutdown), 1);
    parent.host.take();
    popup_host.take();
    let textures = parent.sink.textures.borrow().len();

    assert_eq!(views.run_pending_tasks(Instant::now()), 1);
    assert!(!views.contains(popup));
    assert!(popup_host.take().is_empty());
    assert!(parent.host.take().is_empty());
    assert_eq!(parent.sink.textures.borrow().len(), textures);
    assert_eq!(views.view_count(), 0);
}

#[test]
fn delays_count_from_when_the_task_was_posted() {
    let mut views = OffscreenViewHost::new();
    let view = create_view(&mut views, 10, 10);
    views.on_backing_texture_created(view.id).unwrap();
    let posted_by = Instant::now();
    view.host.take();

    // First seen by a pass that is already past the due time.
    assert_eq!(views.run_pending_tasks(posted_by + FORCE_RENDER_INTERVAL), 1);
    assert_eq!(view.host.take(), vec![HostCall::Invalidate(None)]);
    assert_eq!(views.pending_task_count(), 1);
}
