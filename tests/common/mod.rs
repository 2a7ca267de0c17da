//! Shared fakes for `xian_offscreen` integration tests: an in-memory producer context and
//! secondary device, a recording render host and a recording frame sink. No GPU needed.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use dpi::{LogicalSize, PhysicalSize};
use xian_offscreen::engine::compositor::Bitmap;
use xian_offscreen::engine::error::{OffscreenError, OffscreenResult};
use xian_offscreen::engine::geometry::Rect;
use xian_offscreen::engine::gpu::{
    DeviceType, FenceId, GpuFence, ImportedFence, Mailbox, PendingFence, ProducerContext,
    SecondaryDevice,
};
use xian_offscreen::engine::offscreen::{
    Color, LocalSurfaceId, MouseEvent, MouseWheelEvent, OffscreenViewHost, OffscreenViewInit,
    RenderWidgetHost, ViewId,
};
use xian_offscreen::engine::paint::{FrameSink, TexturePaint};

/// Installs a test subscriber once so `tracing` output shows up with `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceEvent {
    Created(u32),
    Destroyed(u32),
}

/// Producer context that hands out sequential fences and logs their lifetime.
#[derive(Default)]
pub struct FakeProducer {
    next_id: Cell<u32>,
    pub events: RefCell<Vec<FenceEvent>>,
    pub fail_next_fence: Cell<bool>,
    pub report_failure: Cell<bool>,
    images: RefCell<BTreeMap<Mailbox, u64>>,
}

impl FakeProducer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn created(&self) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                FenceEvent::Created(id) => Some(*id),
                FenceEvent::Destroyed(_) => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                FenceEvent::Destroyed(id) => Some(*id),
                FenceEvent::Created(_) => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.images.borrow().len()
    }
}

/// Raw value the fake uses for fence `id`.
pub fn fake_fence_raw(id: u32) -> u64 {
    0x1000 + u64::from(id)
}

impl ProducerContext for FakeProducer {
    fn create_gpu_fence(&self) -> OffscreenResult<PendingFence> {
        if self.fail_next_fence.replace(false) {
            return Err(OffscreenError::fence_creation("fake driver refused"));
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.events.borrow_mut().push(FenceEvent::Created(id));

        if self.report_failure.replace(false) {
            let (pending, completer) = PendingFence::new(FenceId(id));
            completer.complete(None);
            return Ok(pending);
        }
        Ok(PendingFence::ready(
            FenceId(id),
            GpuFence::from_raw(fake_fence_raw(id)),
        ))
    }

    fn destroy_gpu_fence(&self, id: FenceId, fence: GpuFence) {
        assert_eq!(fence.raw(), fake_fence_raw(id.0));
        self.events.borrow_mut().push(FenceEvent::Destroyed(id.0));
    }

    fn create_shared_image(
        &self,
        shared_handle: u64,
        size: PhysicalSize<u32>,
    ) -> OffscreenResult<Mailbox> {
        if size.width == 0 || size.height == 0 {
            return Err(OffscreenError::invalid_argument("empty image"));
        }
        let mut name = [0u8; 16];
        name[..8].copy_from_slice(&shared_handle.to_le_bytes());
        name[8] = self.images.borrow().len() as u8 + 1;
        let mailbox = Mailbox::from_name_bytes(name, true);
        self.images.borrow_mut().insert(mailbox, shared_handle);
        Ok(mailbox)
    }

    fn delete_shared_image(&self, mailbox: &Mailbox) -> OffscreenResult<()> {
        self.images
            .borrow_mut()
            .remove(mailbox)
            .map(|_| ())
            .ok_or_else(|| OffscreenError::not_found("unknown mailbox"))
    }
}

/// Secondary device that records the raw fences it waited on.
pub struct FakeDevice {
    pub waits: Rc<RefCell<Vec<u64>>>,
    pub fail: Rc<Cell<bool>>,
}

impl FakeDevice {
    pub fn new() -> (Self, Rc<RefCell<Vec<u64>>>, Rc<Cell<bool>>) {
        let waits = Rc::new(RefCell::new(Vec::new()));
        let fail = Rc::new(Cell::new(false));
        (
            Self {
                waits: waits.clone(),
                fail: fail.clone(),
            },
            waits,
            fail,
        )
    }
}

impl SecondaryDevice for FakeDevice {
    fn device_type(&self) -> DeviceType {
        DeviceType::Gl
    }

    fn wait(&self, fence: &GpuFence) -> OffscreenResult<ImportedFence> {
        if self.fail.get() {
            return Err(OffscreenError::device_wait("fake device lost"));
        }
        self.waits.borrow_mut().push(fence.raw());
        Ok(ImportedFence::new(fence.raw()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HostCall {
    WasShown,
    WasHidden,
    SynchronizeVisualProperties,
    EmbedSurface(LocalSurfaceId, PhysicalSize<u32>),
    LostCapture,
    BeginFrames(bool),
    VsyncInterval(Duration),
    BackgroundColor(Color),
    Invalidate(Option<Rect>),
    Mouse(MouseEvent),
    Wheel(MouseWheelEvent),
    Shutdown,
}

/// Render host that logs every call.
#[derive(Default)]
pub struct RecordingHost {
    pub calls: RefCell<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn take(&self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls.borrow_mut())
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn embeds(&self) -> Vec<(LocalSurfaceId, PhysicalSize<u32>)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                HostCall::EmbedSurface(id, size) => Some((*id, *size)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: HostCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl RenderWidgetHost for RecordingHost {
    fn was_shown(&self) {
        self.push(HostCall::WasShown);
    }

    fn was_hidden(&self) {
        self.push(HostCall::WasHidden);
    }

    fn synchronize_visual_properties(&self) {
        self.push(HostCall::SynchronizeVisualProperties);
    }

    fn embed_surface(&self, surface_id: LocalSurfaceId, size: PhysicalSize<u32>) {
        self.push(HostCall::EmbedSurface(surface_id, size));
    }

    fn lost_capture(&self) {
        self.push(HostCall::LostCapture);
    }

    fn set_begin_frames_enabled(&self, enabled: bool) {
        self.push(HostCall::BeginFrames(enabled));
    }

    fn set_vsync_interval(&self, interval: Duration) {
        self.push(HostCall::VsyncInterval(interval));
    }

    fn set_background_color(&self, color: Color) {
        self.push(HostCall::BackgroundColor(color));
    }

    fn invalidate(&self, rect: Option<Rect>) {
        self.push(HostCall::Invalidate(rect));
    }

    fn forward_mouse_event(&self, event: &MouseEvent) {
        self.push(HostCall::Mouse(*event));
    }

    fn forward_mouse_wheel_event(&self, event: &MouseWheelEvent) {
        self.push(HostCall::Wheel(*event));
    }

    fn shutdown_widget(&self) {
        self.push(HostCall::Shutdown);
    }
}

/// What a [`RecordingSink`] saw for one texture frame (the release is run on receipt).
#[derive(Clone, Debug, PartialEq)]
pub struct SeenTexture {
    pub mailbox: Mailbox,
    pub content_rect: Rect,
    pub is_popup: bool,
}

/// Frame sink that keeps every software frame and releases texture frames immediately.
#[derive(Default)]
pub struct RecordingSink {
    pub paints: RefCell<Vec<(Rect, Bitmap)>>,
    pub textures: RefCell<Vec<SeenTexture>>,
}

impl RecordingSink {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl FrameSink for RecordingSink {
    fn on_paint(&self, damage: Rect, bitmap: &Bitmap) {
        self.paints.borrow_mut().push((damage, bitmap.clone()));
    }

    fn on_texture_paint(&self, frame: TexturePaint) {
        self.textures.borrow_mut().push(SeenTexture {
            mailbox: frame.mailbox,
            content_rect: frame.content_rect,
            is_popup: frame.is_popup,
        });
        frame.release.release_unused();
    }
}

/// A shown root view of `width x height` DIP with its recording host and sink.
pub struct TestView {
    pub id: ViewId,
    pub host: Rc<RecordingHost>,
    pub sink: Rc<RecordingSink>,
}

pub fn create_view(views: &mut OffscreenViewHost, width: u32, height: u32) -> TestView {
    let host = RecordingHost::new();
    let sink = RecordingSink::new();
    let mut init = OffscreenViewInit::new(host.clone(), sink.clone());
    init.size = LogicalSize::new(width, height);
    let id = views.create_view(init);
    TestView { id, host, sink }
}

/// Opaque frame matching the view's current root layer.
pub fn frame_for(views: &OffscreenViewHost, id: ViewId, bgra: [u8; 4]) -> Bitmap {
    let size = views
        .root_layer_pixel_size(id)
        .expect("view exists");
    Bitmap::filled(size, bgra)
}
