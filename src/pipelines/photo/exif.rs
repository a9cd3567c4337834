// SPDX-License-Identifier: GPL-3.0-only

//! EXIF APP1 segment writer
//!
//! Builds a little-endian TIFF structure (IFD0, Exif sub-IFD, optional GPS
//! sub-IFD) from the merged capture metadata and splices it into an encoded
//! JPEG right after SOI/APP0. Any existing EXIF segment is replaced.

use super::metadata::{self, MetadataMap, tags};

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";
/// Segment length field is u16 and counts itself
const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

// TIFF field types
const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

// Tags
const TAG_IMAGE_WIDTH: u16 = 0x0100;
const TAG_IMAGE_LENGTH: u16 = 0x0101;
const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_ARTIST: u16 = 0x013B;
const TAG_COPYRIGHT: u16 = 0x8298;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_DATE_TIME_DIGITIZED: u16 = 0x9004;
const TAG_PIXEL_X_DIMENSION: u16 = 0xA002;
const TAG_PIXEL_Y_DIMENSION: u16 = 0xA003;
const TAG_GPS_VERSION: u16 = 0x0000;
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;

/// Why an EXIF segment could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExifError {
    NotJpeg,
    TooLarge(usize),
}

impl std::fmt::Display for ExifError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExifError::NotJpeg => write!(f, "data is not a JPEG stream"),
            ExifError::TooLarge(len) => write!(f, "EXIF payload of {} bytes exceeds one segment", len),
        }
    }
}

impl std::error::Error for ExifError {}

#[derive(Debug, Clone)]
enum Value {
    Byte(Vec<u8>),
    Ascii(String),
    Short(u16),
    Long(u32),
    Rational(Vec<(u32, u32)>),
}

impl Value {
    fn field_type(&self) -> u16 {
        match self {
            Value::Byte(_) => TYPE_BYTE,
            Value::Ascii(_) => TYPE_ASCII,
            Value::Short(_) => TYPE_SHORT,
            Value::Long(_) => TYPE_LONG,
            Value::Rational(_) => TYPE_RATIONAL,
        }
    }

    fn count(&self) -> u32 {
        match self {
            Value::Byte(bytes) => bytes.len() as u32,
            // NUL terminator included
            Value::Ascii(text) => text.len() as u32 + 1,
            Value::Short(_) | Value::Long(_) => 1,
            Value::Rational(parts) => parts.len() as u32,
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Value::Byte(bytes) => bytes.clone(),
            Value::Ascii(text) => {
                let mut out = text.as_bytes().to_vec();
                out.push(0);
                out
            }
            Value::Short(v) => v.to_le_bytes().to_vec(),
            Value::Long(v) => v.to_le_bytes().to_vec(),
            Value::Rational(parts) => parts
                .iter()
                .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct Ifd {
    entries: Vec<(u16, Value)>,
}

impl Ifd {
    fn push(&mut self, tag: u16, value: Value) {
        self.entries.push((tag, value));
    }

    fn push_ascii(&mut self, tag: u16, source: &MetadataMap, key: &str) {
        if let Some(text) = source.get(key).filter(|t| !t.is_empty() && t.is_ascii()) {
            self.push(tag, Value::Ascii(text.clone()));
        }
    }

    /// Directory plus out-of-line data
    fn byte_len(&self) -> usize {
        let data: usize = self
            .entries
            .iter()
            .map(|(_, v)| padded(v.encode().len()))
            .filter(|len| *len > 4)
            .sum();
        2 + self.entries.len() * 12 + 4 + data
    }

    /// Serialize with the directory starting at `offset` from the TIFF header
    fn write(&mut self, offset: usize, out: &mut Vec<u8>) {
        self.entries.sort_by_key(|(tag, _)| *tag);

        let mut data = Vec::new();
        let data_start = offset + 2 + self.entries.len() * 12 + 4;

        out.extend_from_slice(&(self.entries.len() as u16).to_le_bytes());
        for (tag, value) in &self.entries {
            let bytes = value.encode();
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&value.field_type().to_le_bytes());
            out.extend_from_slice(&value.count().to_le_bytes());
            if bytes.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..bytes.len()].copy_from_slice(&bytes);
                out.extend_from_slice(&inline);
            } else {
                let at = (data_start + data.len()) as u32;
                out.extend_from_slice(&at.to_le_bytes());
                data.extend_from_slice(&bytes);
                if bytes.len() % 2 == 1 {
                    data.push(0);
                }
            }
        }
        // No next IFD
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&data);
    }
}

fn padded(len: usize) -> usize {
    len + len % 2
}

/// Build the TIFF body (header + IFDs) for the given final image
pub fn build_tiff(metadata: &MetadataMap, width: u32, height: u32) -> Vec<u8> {
    let mut ifd0 = Ifd::default();
    ifd0.push(TAG_IMAGE_WIDTH, Value::Long(width));
    ifd0.push(TAG_IMAGE_LENGTH, Value::Long(height));
    ifd0.push(TAG_ORIENTATION, Value::Short(1));
    ifd0.push_ascii(TAG_MAKE, metadata, tags::MAKE);
    ifd0.push_ascii(TAG_MODEL, metadata, tags::MODEL);
    ifd0.push_ascii(TAG_SOFTWARE, metadata, tags::SOFTWARE);
    ifd0.push_ascii(TAG_DATE_TIME, metadata, tags::DATE_TIME);
    ifd0.push_ascii(TAG_ARTIST, metadata, tags::ARTIST);
    ifd0.push_ascii(TAG_COPYRIGHT, metadata, tags::COPYRIGHT);

    let mut exif = Ifd::default();
    exif.push(TAG_PIXEL_X_DIMENSION, Value::Long(width));
    exif.push(TAG_PIXEL_Y_DIMENSION, Value::Long(height));
    exif.push_ascii(TAG_DATE_TIME_ORIGINAL, metadata, tags::DATE_TIME_ORIGINAL);
    exif.push_ascii(TAG_DATE_TIME_DIGITIZED, metadata, tags::DATE_TIME_DIGITIZED);

    let gps = metadata::gps_coordinates(metadata).map(|(lat, lon)| {
        let mut gps = Ifd::default();
        gps.push(TAG_GPS_VERSION, Value::Byte(vec![2, 3, 0, 0]));
        gps.push(TAG_GPS_LATITUDE_REF, Value::Ascii(if lat < 0.0 { "S" } else { "N" }.into()));
        gps.push(TAG_GPS_LATITUDE, Value::Rational(metadata::to_dms_rationals(lat).to_vec()));
        gps.push(TAG_GPS_LONGITUDE_REF, Value::Ascii(if lon < 0.0 { "W" } else { "E" }.into()));
        gps.push(TAG_GPS_LONGITUDE, Value::Rational(metadata::to_dms_rationals(lon).to_vec()));
        gps
    });

    // Pointer entries are fixed-size, so lengths are known before offsets
    ifd0.push(TAG_EXIF_IFD, Value::Long(0));
    if gps.is_some() {
        ifd0.push(TAG_GPS_IFD, Value::Long(0));
    }

    let ifd0_offset = 8;
    let exif_offset = ifd0_offset + ifd0.byte_len();
    let gps_offset = exif_offset + exif.byte_len();

    for (tag, value) in ifd0.entries.iter_mut() {
        match *tag {
            TAG_EXIF_IFD => *value = Value::Long(exif_offset as u32),
            TAG_GPS_IFD => *value = Value::Long(gps_offset as u32),
            _ => {}
        }
    }

    let mut out = Vec::with_capacity(gps_offset + 128);
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&(ifd0_offset as u32).to_le_bytes());
    ifd0.write(ifd0_offset, &mut out);
    exif.write(exif_offset, &mut out);
    if let Some(mut gps) = gps {
        gps.write(gps_offset, &mut out);
    }
    out
}

/// Insert a fresh EXIF segment into `jpeg`, replacing any existing one
pub fn embed(jpeg: &[u8], metadata: &MetadataMap, width: u32, height: u32) -> Result<Vec<u8>, ExifError> {
    if !jpeg.starts_with(&SOI) {
        return Err(ExifError::NotJpeg);
    }

    let tiff = build_tiff(metadata, width, height);
    let payload_len = EXIF_HEADER.len() + tiff.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        return Err(ExifError::TooLarge(payload_len));
    }

    // Walk the header segments: keep APP0 first, drop old EXIF
    let mut pos = SOI.len();
    let mut app0 = Vec::new();
    let mut kept = Vec::new();
    while pos + 4 <= jpeg.len() && jpeg[pos] == 0xFF {
        let marker = jpeg[pos + 1];
        if !(0xE0..=0xEF).contains(&marker) {
            break;
        }
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(ExifError::NotJpeg);
        }
        let segment = &jpeg[pos..end];
        let is_exif = marker == APP1 && segment.get(4..10) == Some(&EXIF_HEADER[..]);
        if marker == APP0 && app0.is_empty() {
            app0.extend_from_slice(segment);
        } else if !is_exif {
            kept.extend_from_slice(segment);
        }
        pos = end;
    }

    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 4);
    out.extend_from_slice(&SOI);
    out.extend_from_slice(&app0);
    out.extend_from_slice(&[0xFF, APP1]);
    out.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&kept);
    out.extend_from_slice(&jpeg[pos..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u16(b: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([b[at], b[at + 1]])
    }

    fn read_u32(b: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    /// (tag, type, count, value/offset) entries of the IFD at `offset`
    fn entries(tiff: &[u8], offset: usize) -> Vec<(u16, u16, u32, u32)> {
        let count = read_u16(tiff, offset) as usize;
        (0..count)
            .map(|i| {
                let at = offset + 2 + i * 12;
                (read_u16(tiff, at), read_u16(tiff, at + 2), read_u32(tiff, at + 4), read_u32(tiff, at + 8))
            })
            .collect()
    }

    fn sample_metadata() -> MetadataMap {
        [
            ("Make", "Acme"),
            ("Model", "Cam 3000"),
            ("DateTimeOriginal", "2024:03:09 14:05:00"),
            ("GPSLatitude", "48/1,51/1,300/10000"),
            ("GPSLatitudeRef", "N"),
            ("GPSLongitude", "2/1,17/1,0/10000"),
            ("GPSLongitudeRef", "W"),
            ("Orientation", "6"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_ifd0_is_sorted_and_upright() {
        let tiff = build_tiff(&sample_metadata(), 1200, 1600);
        assert_eq!(&tiff[0..4], b"II*\0");

        let ifd0 = entries(&tiff, read_u32(&tiff, 4) as usize);
        let tags: Vec<u16> = ifd0.iter().map(|e| e.0).collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);

        let orientation = ifd0.iter().find(|e| e.0 == TAG_ORIENTATION).unwrap();
        assert_eq!((orientation.1, orientation.3), (TYPE_SHORT, 1));
        let width = ifd0.iter().find(|e| e.0 == TAG_IMAGE_WIDTH).unwrap();
        assert_eq!(width.3, 1200);
    }

    #[test]
    fn test_exif_subifd_carries_pixel_dimensions() {
        let tiff = build_tiff(&sample_metadata(), 1200, 1600);
        let ifd0 = entries(&tiff, 8);
        let exif_offset = ifd0.iter().find(|e| e.0 == TAG_EXIF_IFD).unwrap().3 as usize;
        let exif = entries(&tiff, exif_offset);

        let y = exif.iter().find(|e| e.0 == TAG_PIXEL_Y_DIMENSION).unwrap();
        assert_eq!(y.3, 1600);
        let original = exif.iter().find(|e| e.0 == TAG_DATE_TIME_ORIGINAL).unwrap();
        let at = original.3 as usize;
        assert_eq!(&tiff[at..at + 19], b"2024:03:09 14:05:00");
    }

    #[test]
    fn test_gps_subifd_present_only_with_coordinates() {
        let tiff = build_tiff(&sample_metadata(), 10, 10);
        let ifd0 = entries(&tiff, 8);
        let gps_offset = ifd0.iter().find(|e| e.0 == TAG_GPS_IFD).unwrap().3 as usize;
        let gps = entries(&tiff, gps_offset);
        let lon_ref = gps.iter().find(|e| e.0 == TAG_GPS_LONGITUDE_REF).unwrap();
        assert_eq!(lon_ref.3 & 0xFF, b'W' as u32);

        let bare = build_tiff(&MetadataMap::new(), 10, 10);
        assert!(entries(&bare, 8).iter().all(|e| e.0 != TAG_GPS_IFD));
    }

    #[test]
    fn test_embed_replaces_existing_exif_after_app0() {
        let app0 = [0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB];
        let old_exif = [0xFF, 0xE1, 0x00, 0x08, b'E', b'x', b'i', b'f', 0, 0];
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&app0);
        jpeg.extend_from_slice(&old_exif);
        jpeg.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x02, 0xFF, 0xD9]);

        let out = embed(&jpeg, &MetadataMap::new(), 4, 4).unwrap();
        assert_eq!(&out[0..2], &SOI);
        assert_eq!(&out[2..8], &app0);
        assert_eq!(&out[8..10], &[0xFF, 0xE1]);
        assert_eq!(&out[12..18], EXIF_HEADER);
        assert!(out.ends_with(&[0xFF, 0xDB, 0x00, 0x02, 0xFF, 0xD9]));

        let exif_segments = out.windows(6).filter(|w| w == b"Exif\0\0").count();
        assert_eq!(exif_segments, 1);
    }

    #[test]
    fn test_embed_rejects_non_jpeg() {
        assert_eq!(embed(b"\x89PNG", &MetadataMap::new(), 1, 1), Err(ExifError::NotJpeg));
    }
}
