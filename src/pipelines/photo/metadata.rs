// SPDX-License-Identifier: GPL-3.0-only

//! Capture metadata handling
//!
//! Source metadata arrives as EXIF-style tag names mapped to strings. The
//! pipeline never edits that map; it builds a [`MetadataOverlay`] holding
//! only the tags it rewrites, and merges on emission.

pub use crate::backends::camera::types::MetadataMap;
use chrono::{DateTime, Local, NaiveDateTime};

/// Tag names used by the pipeline
pub mod tags {
    pub const ORIENTATION: &str = "Orientation";
    pub const IMAGE_WIDTH: &str = "ImageWidth";
    pub const IMAGE_LENGTH: &str = "ImageLength";
    pub const PIXEL_X_DIMENSION: &str = "PixelXDimension";
    pub const PIXEL_Y_DIMENSION: &str = "PixelYDimension";
    pub const DATE_TIME: &str = "DateTime";
    pub const DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
    pub const DATE_TIME_DIGITIZED: &str = "DateTimeDigitized";
    pub const MAKE: &str = "Make";
    pub const MODEL: &str = "Model";
    pub const SOFTWARE: &str = "Software";
    pub const ARTIST: &str = "Artist";
    pub const COPYRIGHT: &str = "Copyright";
    pub const GPS_LATITUDE: &str = "GPSLatitude";
    pub const GPS_LATITUDE_REF: &str = "GPSLatitudeRef";
    pub const GPS_LONGITUDE: &str = "GPSLongitude";
    pub const GPS_LONGITUDE_REF: &str = "GPSLongitudeRef";
    pub const GPS_ALTITUDE: &str = "GPSAltitude";
}

/// EXIF date format ("2024:03:09 14:05:00")
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
/// Format used for the overlay label ("2024-03-09 14:05:00")
pub const LABEL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tags rewritten by the pipeline, layered over untouched source tags
#[derive(Debug, Clone, Default)]
pub struct MetadataOverlay {
    overrides: MetadataMap,
}

impl MetadataOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, tag: &str, value: impl Into<String>) {
        self.overrides.insert(tag.to_string(), value.into());
    }

    /// Record final pixel dimensions and mark the pixels as upright
    pub fn record_output(&mut self, width: u32, height: u32) {
        self.set(tags::PIXEL_X_DIMENSION, width.to_string());
        self.set(tags::PIXEL_Y_DIMENSION, height.to_string());
        self.set(tags::IMAGE_WIDTH, width.to_string());
        self.set(tags::IMAGE_LENGTH, height.to_string());
        self.set(tags::ORIENTATION, "1");
    }

    pub fn overrides(&self) -> &MetadataMap {
        &self.overrides
    }

    /// Source tags with overrides applied tag by tag
    pub fn merged(&self, source: &MetadataMap) -> MetadataMap {
        let mut merged = source.clone();
        for (tag, value) in &self.overrides {
            merged.insert(tag.clone(), value.clone());
        }
        merged
    }
}

/// EXIF orientation (1-8), defaulting to 1 when absent or malformed
pub fn orientation(metadata: &MetadataMap) -> u16 {
    metadata
        .get(tags::ORIENTATION)
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|v| (1..=8).contains(v))
        .unwrap_or(1)
}

/// Capture time from `DateTimeOriginal`, then `DateTime`
pub fn capture_time(metadata: &MetadataMap) -> Option<NaiveDateTime> {
    [tags::DATE_TIME_ORIGINAL, tags::DATE_TIME]
        .iter()
        .filter_map(|tag| metadata.get(*tag))
        .find_map(|value| NaiveDateTime::parse_from_str(value.trim(), EXIF_DATE_FORMAT).ok())
}

/// Label text for the timestamp pill; falls back to `now` when the
/// metadata carries no parseable time
pub fn timestamp_label(metadata: &MetadataMap, now: DateTime<Local>) -> String {
    match capture_time(metadata) {
        Some(taken) => taken.format(LABEL_DATE_FORMAT).to_string(),
        None => now.format(LABEL_DATE_FORMAT).to_string(),
    }
}

/// Label text for the location pill, `None` without usable GPS tags
pub fn location_label(metadata: &MetadataMap) -> Option<String> {
    let (lat, lon) = gps_coordinates(metadata)?;
    Some(format!("{:.5}, {:.5}", lat, lon))
}

/// Signed decimal latitude/longitude
pub fn gps_coordinates(metadata: &MetadataMap) -> Option<(f64, f64)> {
    let lat = parse_coordinate(
        metadata.get(tags::GPS_LATITUDE)?,
        metadata.get(tags::GPS_LATITUDE_REF).map(String::as_str),
    )?;
    let lon = parse_coordinate(
        metadata.get(tags::GPS_LONGITUDE)?,
        metadata.get(tags::GPS_LONGITUDE_REF).map(String::as_str),
    )?;
    Some((lat, lon))
}

/// Parse a coordinate in either decimal form ("37.42") or EXIF DMS
/// rational form ("37/1,25/1,1234/100")
pub fn parse_coordinate(value: &str, reference: Option<&str>) -> Option<f64> {
    let value = value.trim();
    let magnitude = if value.contains('/') {
        let mut parts = value.split(',').map(parse_rational);
        let degrees = parts.next()??;
        let minutes = parts.next().flatten().unwrap_or(0.0);
        let seconds = parts.next().flatten().unwrap_or(0.0);
        degrees + minutes / 60.0 + seconds / 3600.0
    } else {
        value.parse::<f64>().ok()?
    };

    if !magnitude.is_finite() {
        return None;
    }

    let negative = matches!(reference.map(str::trim), Some("S") | Some("W"));
    Some(if negative { -magnitude.abs() } else { magnitude })
}

fn parse_rational(part: &str) -> Option<f64> {
    let (num, den) = part.trim().split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    (den != 0.0).then(|| num / den)
}

/// Degrees, minutes and seconds as EXIF rationals (seconds in 1/10000)
pub fn to_dms_rationals(value: f64) -> [(u32, u32); 3] {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes_full = (value - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;
    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        ((seconds * 10_000.0).round() as u32, 10_000),
    ]
}

/// String form of [`to_dms_rationals`], as cameras report it
pub fn to_dms_string(value: f64) -> String {
    to_dms_rationals(value)
        .iter()
        .map(|(n, d)| format!("{}/{}", n, d))
        .collect::<Vec<_>>()
        .join(",")
}
