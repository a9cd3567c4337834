// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for captured frames
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │  Raw JPEG    │ ──▶ │  Photo Pipeline   │ ──▶ │  JPEG + EXIF │
//! │  + metadata  │     │  - orientation    │     │  + metadata  │
//! │              │     │  - resize / crop  │     │              │
//! │              │     │  - overlay        │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! Pipelines are synchronous; the session runs them on its hardware
//! executor right after the capture completes.
//!
//! # Modules
//!
//! - [`photo`]: still and sample post-processing

pub mod photo;
