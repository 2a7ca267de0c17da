mod common;

use std::sync::{Arc, Mutex};

use xian_offscreen::engine::canvas::{
    CanvasFrame, CanvasObserver, CanvasObserverRegistry, CanvasTextureProducer,
};
use xian_offscreen::engine::geometry::Rect;
use xian_offscreen::engine::gpu::{
    CommandBufferNamespace, MAILBOX_NAME_LEN, Mailbox, ReleaseCallback, SyncToken,
};

/// Keeps every frame it receives; releases are run by the test.
#[derive(Default)]
struct Keeping(Mutex<Vec<CanvasFrame>>);

impl CanvasObserver for Keeping {
    fn on_canvas_texture_paint(&self, frame: CanvasFrame) {
        self.0.lock().unwrap().push(frame);
    }
}

fn sample_mailbox() -> Mailbox {
    let mut name = [0u8; MAILBOX_NAME_LEN];
    for (i, byte) in name.iter_mut().enumerate() {
        *byte = 0xF0u8.wrapping_add(i as u8);
    }
    Mailbox::from_name_bytes(name, true)
}

fn sample_token() -> SyncToken {
    SyncToken::new(true, CommandBufferNamespace::GpuIo, 0xDEAD_BEEF_0000_0001, 42)
}

fn recording_release(log: &Arc<Mutex<Vec<SyncToken>>>) -> ReleaseCallback {
    let log = log.clone();
    ReleaseCallback::new(move |token| log.lock().unwrap().push(token))
}

#[test]
fn observer_sees_the_exact_mailbox_and_token() {
    common::init_tracing();
    let registry = Arc::new(CanvasObserverRegistry::new());
    let observer = Arc::new(Keeping::default());
    let shared: Arc<dyn CanvasObserver> = observer.clone();
    registry.add("canvas-1", &shared);

    let released = Arc::new(Mutex::new(Vec::new()));
    let producer = CanvasTextureProducer::new(registry.clone());
    producer.on_texture_produced(
        "canvas-1",
        sample_mailbox(),
        sample_token(),
        Rect::new(4, 8, 300, 150),
        recording_release(&released),
    );

    let frame = observer.0.lock().unwrap().pop().unwrap();
    assert_eq!(frame.mailbox.name_bytes(), sample_mailbox().name_bytes());
    assert!(frame.mailbox.shared_image);
    assert_eq!(frame.sync_token, sample_token());
    assert_eq!(frame.rect, Rect::new(4, 8, 300, 150));
    assert!(released.lock().unwrap().is_empty());

    let consumer_token = SyncToken::new(true, CommandBufferNamespace::GpuIo, 7, 8);
    frame.release.run(consumer_token);
    assert_eq!(*released.lock().unwrap(), vec![consumer_token]);
}

#[test]
fn frame_without_observer_is_released_unused() {
    let registry = Arc::new(CanvasObserverRegistry::new());
    let released = Arc::new(Mutex::new(Vec::new()));
    CanvasTextureProducer::new(registry).on_texture_produced(
        "missing",
        sample_mailbox(),
        sample_token(),
        Rect::new(0, 0, 8, 8),
        recording_release(&released),
    );
    assert_eq!(*released.lock().unwrap(), vec![SyncToken::default()]);
}

#[test]
fn observer_dropped_without_releasing_still_releases() {
    let registry = Arc::new(CanvasObserverRegistry::new());
    let observer = Arc::new(Keeping::default());
    let shared: Arc<dyn CanvasObserver> = observer.clone();
    registry.add("canvas-2", &shared);

    let released = Arc::new(Mutex::new(Vec::new()));
    CanvasTextureProducer::new(registry).on_texture_produced(
        "canvas-2",
        sample_mailbox(),
        sample_token(),
        Rect::new(0, 0, 8, 8),
        recording_release(&released),
    );
    drop(shared);
    drop(observer);
    assert_eq!(*released.lock().unwrap(), vec![SyncToken::default()]);
}

#[test]
fn removal_only_matches_the_registered_observer() {
    let registry = Arc::new(CanvasObserverRegistry::new());
    let registered: Arc<dyn CanvasObserver> = Arc::new(Keeping::default());
    let stranger: Arc<dyn CanvasObserver> = Arc::new(Keeping::default());
    registry.add("canvas-3", &registered);

    assert!(!registry.remove("canvas-3", &stranger));
    assert!(registry.contains("canvas-3"));
    assert!(!registry.remove("other", &registered));
    assert!(registry.remove("canvas-3", &registered));
    assert!(!registry.contains("canvas-3"));
}

#[test]
fn producers_on_other_threads_reach_the_observer() {
    let registry = Arc::new(CanvasObserverRegistry::new());
    let observer = Arc::new(Keeping::default());
    let shared: Arc<dyn CanvasObserver> = observer.clone();
    registry.add("worker", &shared);

    let producer = CanvasTextureProducer::new(registry);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let producer = producer.clone();
            std::thread::spawn(move || {
                producer.on_texture_produced(
                    "worker",
                    sample_mailbox(),
                    sample_token(),
                    Rect::new(i, 0, 1, 1),
                    ReleaseCallback::noop(),
                );
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut xs: Vec<i32> = observer.0.lock().unwrap().iter().map(|f| f.rect.x).collect();
    xs.sort_unstable();
    assert_eq!(xs, vec![0, 1, 2, 3]);
}
