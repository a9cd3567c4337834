// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - `process`: run the photo pipeline on a file
//! - `sample`: produce a preview sample from a file
//! - `simulate`: drive a session on the synthetic camera

use camera_session::backends::camera::types::{MetadataMap, SensorRotation};
use camera_session::backends::camera::{SyntheticBackend, SyntheticSettings};
use camera_session::backends::presentation::{HeadlessSurface, PreviewBounds};
use camera_session::constants::SIMULATION_TIMEOUT;
use camera_session::pipelines::photo::{
    CapturePipeline, PhotoRequest, SampleTransform, Size, ViewRegion,
};
use camera_session::{
    CapturePayload, EventSink, PhotoCaptureOptions, SessionConfiguration, SessionController,
    SessionParts, Settings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub struct ProcessArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub quality: u8,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop_to: Option<(u32, u32)>,
    pub timestamp: bool,
    pub location: bool,
}

pub struct SampleArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub quality: u8,
    pub rotation: i32,
    pub max_size: Option<u32>,
    pub region: Option<ViewRegion>,
    pub view: Option<(u32, u32)>,
}

pub struct SimulateArgs {
    pub photos: u32,
    pub stop_during_capture: bool,
    pub capture_delay_ms: u64,
    pub focus: bool,
}

/// Parse `WxH`
pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", value))?;
    let width = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let height = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if width == 0 || height == 0 {
        return Err("size must be positive".to_string());
    }
    Ok((width, height))
}

/// Parse `x,y,w,h`
pub fn parse_region(value: &str) -> Result<ViewRegion, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<i32>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(ViewRegion {
            x,
            y,
            width,
            height,
        }),
        _ => Err(format!("expected x,y,w,h, got '{}'", value)),
    }
}

fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".to_string());
    input.with_file_name(format!("{}_{}.jpg", stem, suffix))
}

/// Run the photo pipeline on a file
pub fn process_image(settings: &Settings, args: ProcessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read(&args.input)?;
    let source: MetadataMap = match &args.metadata {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => MetadataMap::new(),
    };

    let request = PhotoRequest {
        quality: args.quality,
        max_width: args.width,
        max_height: args.height,
        crop_target: args.crop_to.map(|(w, h)| Size::new(w, h)),
        embed_timestamp: args.timestamp,
        embed_location: args.location,
    };

    let pipeline = CapturePipeline::new(settings.overlay.clone());
    let processed = pipeline.process_photo(&raw, &source, &request)?;

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input, "processed"));
    std::fs::write(&output, &processed.bytes)?;

    println!(
        "Wrote {} ({}x{}, {} bytes)",
        output.display(),
        processed.width,
        processed.height,
        processed.bytes.len()
    );
    println!("{}", serde_json::to_string_pretty(&processed.metadata)?);
    Ok(())
}

/// Produce a preview sample from a file
pub fn sample_image(args: SampleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read(&args.input)?;
    let transform = match (args.max_size, args.region, args.view) {
        (Some(max_size), _, _) => SampleTransform::Downscale { max_size },
        (None, Some(region), Some((width, height))) => SampleTransform::Region {
            region,
            view: Size::new(width, height),
        },
        _ => SampleTransform::Passthrough,
    };

    let pipeline = CapturePipeline::default();
    let bytes = pipeline.process_sample(
        &raw,
        SensorRotation::from_degrees_int(args.rotation),
        args.quality,
        &transform,
    )?;

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input, "sample"));
    std::fs::write(&output, &bytes)?;
    println!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

/// Callback observed during a simulation
#[derive(Debug)]
enum SimulationEvent {
    Started(PreviewBounds),
    StartError(String),
    Stopped,
    PictureTaken(String),
    PictureError(String),
    Sample,
    SampleError(String),
}

struct ChannelSink {
    sender: mpsc::Sender<SimulationEvent>,
}

impl ChannelSink {
    fn send(&self, event: SimulationEvent) {
        let _ = self.sender.send(event);
    }
}

impl EventSink for ChannelSink {
    fn on_started(&self, bounds: PreviewBounds) {
        self.send(SimulationEvent::Started(bounds));
    }

    fn on_start_error(&self, message: &str) {
        self.send(SimulationEvent::StartError(message.to_string()));
    }

    fn on_stopped(&self) {
        self.send(SimulationEvent::Stopped);
    }

    fn on_picture_taken(&self, payload: CapturePayload, metadata: &MetadataMap) {
        let summary = match payload {
            CapturePayload::Base64(data) => format!("base64, {} chars", data.len()),
            CapturePayload::FilePath(path) => path.display().to_string(),
        };
        self.send(SimulationEvent::PictureTaken(format!(
            "{}, {} tags",
            summary,
            metadata.len()
        )));
    }

    fn on_picture_taken_error(&self, message: &str) {
        self.send(SimulationEvent::PictureError(message.to_string()));
    }

    fn on_sample_taken(&self, _data: String) {
        self.send(SimulationEvent::Sample);
    }

    fn on_sample_taken_error(&self, message: &str) {
        self.send(SimulationEvent::SampleError(message.to_string()));
    }
}

/// Wait for the next event matching `done`, printing everything seen
fn wait_until(
    receiver: &mpsc::Receiver<SimulationEvent>,
    counter: &mut usize,
    done: impl Fn(&SimulationEvent) -> bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let deadline = Instant::now() + SIMULATION_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = receiver
            .recv_timeout(remaining)
            .map_err(|_| "timed out waiting for session callbacks")?;
        *counter += 1;
        println!("  {:>2}. {:?}", counter, event);
        if let SimulationEvent::StartError(message) = &event {
            return Err(format!("session failed to start: {}", message).into());
        }
        if done(&event) {
            return Ok(());
        }
    }
}

/// Drive a session on the synthetic camera and print the callback order
pub fn simulate(settings: Settings, args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (sender, receiver) = mpsc::channel();
    let backend = SyntheticBackend::new(SyntheticSettings {
        capture_delay: Duration::from_millis(args.capture_delay_ms),
        ..SyntheticSettings::default()
    });

    let storage = Arc::new(settings.storage());
    let controller = SessionController::new(SessionParts {
        backend: Box::new(backend),
        surface: Box::new(HeadlessSurface::new(1080, 1920)),
        events: Arc::new(ChannelSink { sender }),
        storage,
        settings,
    })?;

    println!("Callbacks:");
    let mut counter = 0;

    controller.start_session(SessionConfiguration::default().centered())?;
    wait_until(&receiver, &mut counter, |e| matches!(e, SimulationEvent::Started(_)))?;

    if args.focus {
        controller.set_focus(0.5, 0.5)?;
    }

    for _ in 0..args.photos {
        controller.capture_photo(PhotoCaptureOptions {
            embed_timestamp: true,
            ..PhotoCaptureOptions::default()
        })?;
    }

    if args.stop_during_capture {
        controller.stop_session()?;
        println!(
            "  stop requested: deferred={} active={}",
            controller.is_stop_deferred(),
            controller.active_operations()
        );
    } else {
        let mut remaining = args.photos;
        while remaining > 0 {
            wait_until(&receiver, &mut counter, |e| {
                matches!(
                    e,
                    SimulationEvent::PictureTaken(_) | SimulationEvent::PictureError(_)
                )
            })?;
            remaining -= 1;
        }
        controller.stop_session()?;
    }

    wait_until(&receiver, &mut counter, |e| matches!(e, SimulationEvent::Stopped))?;
    println!("Final state: {}", controller.state());
    Ok(())
}
