// SPDX-License-Identifier: GPL-3.0-only

//! Presentation surface abstraction
//!
//! The preview view lives in the host UI. The session only ever talks to it
//! through [`PresentationSurface`], and only from the presentation executor.

use crate::session::configuration::{GridMode, SessionConfiguration};
use serde::Serialize;
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::debug;

/// On-screen rectangle of the visible preview content, in host coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PreviewBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PreviewBounds {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Host-side preview view
pub trait PresentationSurface: Send {
    /// Insert the preview into the host UI using `config` geometry
    fn attach(&mut self, config: &SessionConfiguration) -> Result<(), String>;

    /// Hide the preview while hardware stays bound (deferred stop)
    fn detach(&mut self);

    /// Remove the preview entirely
    fn release(&mut self);

    /// Bounds of the visible camera content; empty before layout
    fn preview_bounds(&self) -> PreviewBounds;

    /// Size of the preview view itself, used for region-crop mapping
    fn view_size(&self) -> Option<(u32, u32)>;

    /// Re-layout after a geometry change
    fn update_layout(&mut self, config: &SessionConfiguration);

    fn set_grid_mode(&mut self, mode: GridMode);

    /// Show the focus ring at normalised coordinates
    fn show_focus_indicator(&mut self, x: f32, y: f32, indicator_id: u64);

    /// Hide the focus ring if `indicator_id` is still the one shown
    fn hide_focus_indicator(&mut self, indicator_id: u64);
}

/// Something a [`HeadlessSurface`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Attached(PreviewBounds),
    Detached,
    Released,
    Layout(PreviewBounds),
    Grid(GridMode),
    ShowIndicator(u64),
    HideIndicator(u64),
}

/// Shared record of surface activity, readable from tests
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    events: Arc<Mutex<Vec<SurfaceEvent>>>,
}

impl SurfaceLog {
    fn push(&self, event: SurfaceEvent) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

/// Surface that lays the preview out against a fixed-size virtual screen
pub struct HeadlessSurface {
    screen: (u32, u32),
    bounds: Option<PreviewBounds>,
    detached: bool,
    grid_mode: GridMode,
    visible_indicator: Option<u64>,
    log: SurfaceLog,
}

impl HeadlessSurface {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            screen: (screen_width.max(1), screen_height.max(1)),
            bounds: None,
            detached: false,
            grid_mode: GridMode::None,
            visible_indicator: None,
            log: SurfaceLog::default(),
        }
    }

    pub fn log(&self) -> SurfaceLog {
        self.log.clone()
    }

    /// Portrait layout: the ratio's long side runs vertically
    fn layout(&self, config: &SessionConfiguration) -> PreviewBounds {
        let (screen_w, screen_h) = self.screen;
        let mut width = if config.width == 0 { screen_w } else { config.width.min(screen_w) };
        let avail_h = screen_h.saturating_sub(config.padding_bottom).max(1);
        let mut height = if config.height == 0 { avail_h } else { config.height.min(avail_h) };

        if let Some(ratio) = config.aspect_ratio {
            let long = ratio.width.max(ratio.height) as u64;
            let short = ratio.width.min(ratio.height) as u64;
            let fitted_h = (width as u64 * long / short) as u32;
            if fitted_h <= height {
                height = fitted_h;
            } else {
                width = (height as u64 * short / long) as u32;
            }
        }

        let (x, y) = if config.is_centered() {
            (
                (screen_w.saturating_sub(width) / 2) as i32,
                (avail_h.saturating_sub(height) / 2) as i32,
            )
        } else {
            (config.x.max(0), config.y.max(0))
        };

        PreviewBounds { x, y, width, height }
    }
}

impl PresentationSurface for HeadlessSurface {
    fn attach(&mut self, config: &SessionConfiguration) -> Result<(), String> {
        let bounds = self.layout(config);
        if bounds.is_empty() {
            return Err(format!("preview has no area: {}x{}", bounds.width, bounds.height));
        }
        self.bounds = Some(bounds);
        self.detached = false;
        self.grid_mode = config.grid_mode;
        self.log.push(SurfaceEvent::Attached(bounds));
        debug!(?bounds, "Headless preview attached");
        Ok(())
    }

    fn detach(&mut self) {
        self.detached = true;
        self.log.push(SurfaceEvent::Detached);
    }

    fn release(&mut self) {
        self.bounds = None;
        self.detached = false;
        self.visible_indicator = None;
        self.log.push(SurfaceEvent::Released);
    }

    fn preview_bounds(&self) -> PreviewBounds {
        self.bounds.unwrap_or_default()
    }

    fn view_size(&self) -> Option<(u32, u32)> {
        self.bounds.filter(|b| !b.is_empty()).map(|b| (b.width, b.height))
    }

    fn update_layout(&mut self, config: &SessionConfiguration) {
        if self.bounds.is_none() {
            return;
        }
        let bounds = self.layout(config);
        self.bounds = Some(bounds);
        self.log.push(SurfaceEvent::Layout(bounds));
    }

    fn set_grid_mode(&mut self, mode: GridMode) {
        self.grid_mode = mode;
        self.log.push(SurfaceEvent::Grid(mode));
    }

    fn show_focus_indicator(&mut self, _x: f32, _y: f32, indicator_id: u64) {
        if self.detached || self.bounds.is_none() {
            return;
        }
        self.visible_indicator = Some(indicator_id);
        self.log.push(SurfaceEvent::ShowIndicator(indicator_id));
    }

    fn hide_focus_indicator(&mut self, indicator_id: u64) {
        self.log.push(SurfaceEvent::HideIndicator(indicator_id));
        if self.visible_indicator == Some(indicator_id) {
            self.visible_indicator = None;
        }
    }
}
