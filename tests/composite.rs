mod common;

use common::{HostCall, RecordingHost, TestView, create_view, frame_for};
use dpi::PhysicalSize;
use xian_offscreen::engine::compositor::Bitmap;
use xian_offscreen::engine::error::OffscreenError;
use xian_offscreen::engine::geometry::{Point, Rect};
use xian_offscreen::engine::offscreen::{
    MouseEvent, MouseEventKind, MouseTarget, OffscreenViewHost, ProxyId, ViewId,
};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLUE: [u8; 4] = [255, 0, 0, 255];
const RED: [u8; 4] = [0, 0, 255, 255];

const PROXY_BOUNDS: Rect = Rect::new(60, 5, 20, 10);

fn painted_view(views: &mut OffscreenViewHost) -> TestView {
    let view = create_view(views, 100, 50);
    let frame = frame_for(views, view.id, WHITE);
    views
        .on_paint(view.id, Rect::new(0, 0, 100, 50), frame)
        .unwrap();
    view
}

fn red_proxy(views: &mut OffscreenViewHost, view: ViewId, bounds: Rect) -> ProxyId {
    let proxy = views.create_view_proxy(bounds, 1.0).unwrap();
    views.add_view_proxy(view, proxy).unwrap();
    let size = views.view_proxy(proxy).unwrap().expected_bitmap_size();
    assert!(views.set_proxy_bitmap(proxy, Bitmap::filled(size, RED)).unwrap());
    proxy
}

fn last_paint(view: &TestView) -> (Rect, Bitmap) {
    view.sink.paints.borrow().last().cloned().unwrap()
}

#[test]
fn frame_without_overlays_is_delivered_without_copying() {
    common::init_tracing();
    let mut views = OffscreenViewHost::new();
    let view = create_view(&mut views, 100, 50);
    let frame = frame_for(&views, view.id, WHITE);

    views
        .on_paint(view.id, Rect::new(3, 4, 5, 6), frame.clone())
        .unwrap();
    let (damage, delivered) = last_paint(&view);
    assert_eq!(damage, Rect::new(3, 4, 5, 6));
    assert!(delivered.shares_pixels_with(&frame));
}

#[test]
fn proxy_is_drawn_over_the_view_and_repaints_its_area() {
    let mut views = OffscreenViewHost::new();
    let view = painted_view(&mut views);
    let proxy = views.create_view_proxy(PROXY_BOUNDS, 1.0).unwrap();
    let red = Bitmap::filled(PhysicalSize::new(20, 10), RED);
    let paints_before = view.sink.paints.borrow().len();

    // Nothing to draw into until the proxy is attached.
    assert!(!views.set_proxy_bitmap(proxy, red.clone()).unwrap());
    assert!(views.view_proxy(proxy).unwrap().bitmap().draws_nothing());
    assert_eq!(view.sink.paints.borrow().len(), paints_before);

    views.add_view_proxy(view.id, proxy).unwrap();
    assert_eq!(views.view_proxy(proxy).unwrap().observer(), Some(view.id));
    assert_eq!(view.sink.paints.borrow().len(), paints_before + 1);
    assert_eq!(last_paint(&view).1.pixel(65, 8), Some(WHITE));

    assert!(views.set_proxy_bitmap(proxy, red).unwrap());
    assert_eq!(view.sink.paints.borrow().len(), paints_before + 2);

    let (damage, bitmap) = last_paint(&view);
    assert_eq!(damage, PROXY_BOUNDS);
    assert_eq!(bitmap.pixel(65, 8), Some(RED));
    assert_eq!(bitmap.pixel(59, 8), Some(WHITE));
}

#[test]
fn damage_is_the_union_of_frame_popup_and_proxies() {
    let mut views = OffscreenViewHost::new();
    let view = painted_view(&mut views);

    let popup = views
        .create_child_view(view.id, RecordingHost::new())
        .unwrap();
    views.init_as_popup(popup, Rect::new(10, 10, 30, 20)).unwrap();
    let popup_frame = frame_for(&views, popup, BLUE);
    views
        .on_paint(popup, Rect::new(0, 0, 30, 20), popup_frame)
        .unwrap();

    red_proxy(&mut views, view.id, PROXY_BOUNDS);

    let frame = frame_for(&views, view.id, WHITE);
    views
        .on_paint(view.id, Rect::new(0, 0, 1, 1), frame)
        .unwrap();
    let (damage, bitmap) = last_paint(&view);
    assert_eq!(damage, Rect::new(0, 0, 80, 30));
    assert_eq!(bitmap.pixel(20, 20), Some(BLUE));
    assert_eq!(bitmap.pixel(70, 10), Some(RED));
    assert_eq!(bitmap.pixel(90, 45), Some(WHITE));
}

#[test]
fn proxy_at_a_higher_scale_needs_a_larger_bitmap() {
    let mut views = OffscreenViewHost::new();
    let view = painted_view(&mut views);
    let proxy = views.create_view_proxy(Rect::new(0, 0, 20, 10), 2.0).unwrap();
    views.add_view_proxy(view.id, proxy).unwrap();
    assert_eq!(
        views.view_proxy(proxy).unwrap().expected_bitmap_size(),
        PhysicalSize::new(40, 20)
    );

    let rejected = Bitmap::filled(PhysicalSize::new(20, 10), RED);
    assert!(!views.set_proxy_bitmap(proxy, rejected).unwrap());
    assert!(views.view_proxy(proxy).unwrap().bitmap().draws_nothing());

    let accepted = Bitmap::filled(PhysicalSize::new(40, 20), RED);
    assert!(views.set_proxy_bitmap(proxy, accepted).unwrap());

    assert!(matches!(
        views.create_view_proxy(Rect::new(0, 0, 1, 1), 0.0),
        Err(OffscreenError::InvalidArgument(_))
    ));
}

#[test]
fn moving_a_proxy_damages_old_and_new_bounds() {
    let mut views = OffscreenViewHost::new();
    let view = painted_view(&mut views);
    let proxy = red_proxy(&mut views, view.id, PROXY_BOUNDS);

    views
        .set_proxy_bounds(proxy, Rect::new(0, 40, 20, 10))
        .unwrap();
    let (damage, bitmap) = last_paint(&view);
    assert_eq!(damage, Rect::new(0, 5, 80, 45));
    assert_eq!(bitmap.pixel(5, 45), Some(RED));
    assert_eq!(bitmap.pixel(65, 8), Some(WHITE));
}

#[test]
fn removing_a_proxy_repaints_the_whole_view() {
    let mut views = OffscreenViewHost::new();
    let view = painted_view(&mut views);
    let proxy = red_proxy(&mut views, view.id, PROXY_BOUNDS);

    views.remove_view_proxy(view.id, proxy).unwrap();
    let (damage, bitmap) = last_paint(&view);
    assert_eq!(damage, Rect::new(0, 0, 100, 50));
    assert_eq!(bitmap.pixel(65, 8), Some(WHITE));
    assert_eq!(views.view_proxy(proxy).unwrap().observer(), None);

    assert!(matches!(
        views.remove_view_proxy(view.id, proxy),
        Err(OffscreenError::NotFound(_))
    ));
}

#[test]
fn attaching_a_proxy_elsewhere_detaches_it() {
    let mut views = OffscreenViewHost::new();
    let first = painted_view(&mut views);
    let second = painted_view(&mut views);
    let proxy = red_proxy(&mut views, first.id, PROXY_BOUNDS);

    views.add_view_proxy(second.id, proxy).unwrap();
    assert_eq!(views.view_proxy(proxy).unwrap().observer(), Some(second.id));

    let (damage, bitmap) = last_paint(&first);
    assert_eq!(damage, Rect::new(0, 0, 100, 50));
    assert_eq!(bitmap.pixel(65, 8), Some(WHITE));
    assert_eq!(last_paint(&second).1.pixel(65, 8), Some(RED));
}

#[test]
fn destroying_the_view_leaves_the_proxy_unattached() {
    let mut views = OffscreenViewHost::new();
    let view = painted_view(&mut views);
    let proxy = red_proxy(&mut views, view.id, PROXY_BOUNDS);

    views.destroy(view.id).unwrap();
    assert_eq!(views.view_proxy(proxy).unwrap().observer(), None);
    let blue = Bitmap::filled(PhysicalSize::new(20, 10), BLUE);
    assert!(!views.set_proxy_bitmap(proxy, blue).unwrap());
    assert_eq!(views.view_proxy(proxy).unwrap().bitmap().pixel(0, 0), Some(RED));
    views.destroy_view_proxy(proxy).unwrap();
    assert!(matches!(
        views.view_proxy(proxy),
        Err(OffscreenError::InvalidHandle)
    ));
}

#[test]
fn mouse_over_a_proxy_is_returned_not_forwarded() {
    let mut views = OffscreenViewHost::new();
    let view = painted_view(&mut views);
    red_proxy(&mut views, view.id, Rect::new(50, 0, 40, 20));
    let upper = red_proxy(&mut views, view.id, PROXY_BOUNDS);
    view.host.take();

    let event = MouseEvent {
        kind: MouseEventKind::Move,
        position: Point::new(65.0, 8.0),
        button: 0,
        modifiers: 0,
    };
    let target = views.route_mouse_event(view.id, event);
    // The most recently added proxy is on top.
    assert_eq!(
        target,
        MouseTarget::Proxy {
            proxy: upper,
            event: MouseEvent {
                position: Point::new(5.0, 3.0),
                ..event
            }
        }
    );
    assert!(
        view.host
            .take()
            .iter()
            .all(|call| !matches!(call, HostCall::Mouse(_)))
    );
}
