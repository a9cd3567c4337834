// SPDX-License-Identifier: MPL-2.0

//! Collaborators the session drives
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              SessionController              │
//! └──────────┬───────────────────────┬──────────┘
//!            │ hardware executor     │ presentation executor
//! ┌──────────┴──────────┐ ┌──────────┴──────────┐
//! │   HardwareBackend   │ │ PresentationSurface │
//! │ (bind, capture,     │ │ (preview bounds,    │
//! │  focus, recording)  │ │  grid, focus ring)  │
//! └─────────────────────┘ └─────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: camera hardware trait, shared types and a synthetic camera
//! - [`presentation`]: preview surface trait and a headless surface

pub mod camera;
pub mod presentation;
