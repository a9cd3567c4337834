// SPDX-License-Identifier: MPL-2.0

//! Shared helpers for session integration tests

#![allow(dead_code)]

use camera_session::backends::camera::types::MetadataMap;
use camera_session::backends::camera::{SyntheticBackend, SyntheticProbe, SyntheticSettings};
use camera_session::backends::presentation::{HeadlessSurface, PreviewBounds, SurfaceLog};
use camera_session::{
    CapturePayload, EventSink, FileSystemStorage, SessionConfiguration, SessionController,
    SessionParts, Settings,
};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub const WAIT: Duration = Duration::from_secs(5);

/// Callback recorded by [`CollectingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started(PreviewBounds),
    StartError(String),
    Stopped,
    PictureTaken(CapturePayload, MetadataMap),
    PictureError(String),
    SampleTaken(String),
    SampleError(String),
}

/// EventSink that keeps every callback in order
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Event>>,
    changed: Condvar,
}

impl CollectingSink {
    fn push(&self, event: Event) {
        self.events.lock().push(event);
        self.changed.notify_all();
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Block until `done` holds for the recorded events; panics after [`WAIT`]
    pub fn wait_for(&self, done: impl Fn(&[Event]) -> bool) -> Vec<Event> {
        let deadline = Instant::now() + WAIT;
        let mut events = self.events.lock();
        while !done(&events) {
            if self.changed.wait_until(&mut events, deadline).timed_out() {
                panic!("timed out waiting for events, have {:?}", *events);
            }
        }
        events.clone()
    }

    /// Wait until at least `n` events match `predicate`
    pub fn wait_count(&self, n: usize, predicate: impl Fn(&Event) -> bool) -> Vec<Event> {
        self.wait_for(|events| events.iter().filter(|e| predicate(e)).count() >= n)
    }
}

impl EventSink for CollectingSink {
    fn on_started(&self, bounds: PreviewBounds) {
        self.push(Event::Started(bounds));
    }

    fn on_start_error(&self, message: &str) {
        self.push(Event::StartError(message.to_string()));
    }

    fn on_stopped(&self) {
        self.push(Event::Stopped);
    }

    fn on_picture_taken(&self, payload: CapturePayload, metadata: &MetadataMap) {
        self.push(Event::PictureTaken(payload, metadata.clone()));
    }

    fn on_picture_taken_error(&self, message: &str) {
        self.push(Event::PictureError(message.to_string()));
    }

    fn on_sample_taken(&self, data: String) {
        self.push(Event::SampleTaken(data));
    }

    fn on_sample_taken_error(&self, message: &str) {
        self.push(Event::SampleError(message.to_string()));
    }
}

pub fn is_started(event: &Event) -> bool {
    matches!(event, Event::Started(_))
}

pub fn is_stopped(event: &Event) -> bool {
    matches!(event, Event::Stopped)
}

pub fn is_picture(event: &Event) -> bool {
    matches!(event, Event::PictureTaken(..))
}

/// A controller on the synthetic camera and a headless 1080x1920 screen
pub struct Harness {
    pub controller: SessionController,
    pub sink: Arc<CollectingSink>,
    pub probe: SyntheticProbe,
    pub surface: SurfaceLog,
    pub dir: TempDir,
}

pub fn harness(camera: SyntheticSettings) -> Harness {
    harness_with(camera, Settings::default())
}

pub fn harness_with(camera: SyntheticSettings, settings: Settings) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = SyntheticBackend::new(camera);
    let probe = backend.probe();
    let surface = HeadlessSurface::new(1080, 1920);
    let surface_log = surface.log();
    let sink = Arc::new(CollectingSink::default());

    let controller = SessionController::new(SessionParts {
        backend: Box::new(backend),
        surface: Box::new(surface),
        events: sink.clone(),
        storage: Arc::new(FileSystemStorage::rooted_at(dir.path())),
        settings,
    })
    .expect("controller");

    Harness {
        controller,
        sink,
        probe,
        surface: surface_log,
        dir,
    }
}

/// Start `config` and wait for `on_started`
pub fn running(camera: SyntheticSettings, config: SessionConfiguration) -> Harness {
    let harness = harness(camera);
    harness.start(config);
    harness
}

impl Harness {
    pub fn start(&self, config: SessionConfiguration) {
        let before = self.sink.count(is_started);
        self.controller.start_session(config).expect("start");
        self.sink.wait_count(before + 1, is_started);
    }

    pub fn stop_and_wait(&self) {
        let before = self.sink.count(is_stopped);
        self.controller.stop_session().expect("stop");
        self.sink.wait_count(before + 1, is_stopped);
    }
}

/// Poll `condition` until it holds; panics after [`WAIT`]
pub fn eventually(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        std::thread::sleep(Duration::from_millis(2));
    }
}
