// SPDX-License-Identifier: MPL-2.0

//! Persistence for captured photos and recordings

use crate::constants::file_names;
use crate::pipelines::photo::EncodingFormat;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where finished captures go
pub trait PersistenceSink: Send + Sync {
    /// Store bytes in the user's gallery; returns the written path
    fn save_to_gallery(&self, bytes: &[u8]) -> io::Result<PathBuf>;

    /// Store bytes in the capture cache, for file-path payloads
    fn write_capture_file(&self, bytes: &[u8]) -> io::Result<PathBuf>;

    /// Fresh output path for a recording
    fn video_output_path(&self) -> io::Result<PathBuf>;
}

/// Plain directory-backed storage
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    gallery_dir: PathBuf,
    cache_dir: PathBuf,
    video_dir: PathBuf,
}

impl FileSystemStorage {
    pub fn new(gallery_dir: PathBuf, cache_dir: PathBuf, video_dir: PathBuf) -> Self {
        Self {
            gallery_dir,
            cache_dir,
            video_dir,
        }
    }

    /// Everything under one root (`gallery/`, `cache/`, `videos/`)
    pub fn rooted_at(root: &Path) -> Self {
        Self::new(root.join("gallery"), root.join("cache"), root.join("videos"))
    }

    pub fn gallery_dir(&self) -> &Path {
        &self.gallery_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }
}

impl PersistenceSink for FileSystemStorage {
    fn save_to_gallery(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        let format = EncodingFormat::detect(bytes).unwrap_or(EncodingFormat::Jpeg);
        let path = write_unique(
            &self.gallery_dir,
            file_names::GALLERY_PREFIX,
            format.extension(),
            bytes,
        )?;
        info!(path = %path.display(), mime = format.mime_type(), "Saved to gallery");
        Ok(path)
    }

    fn write_capture_file(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = write_unique(&self.cache_dir, file_names::CAPTURE_PREFIX, "jpg", bytes)?;
        debug!(path = %path.display(), "Capture written to cache");
        Ok(path)
    }

    fn video_output_path(&self) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.video_dir)?;
        let millis = chrono::Utc::now().timestamp_millis();
        Ok(self.video_dir.join(format!(
            "{}{}.{}",
            file_names::VIDEO_PREFIX,
            millis,
            file_names::VIDEO_EXTENSION
        )))
    }
}

/// Write `bytes` to `<dir>/<prefix><timestamp>[_n].<ext>` without clobbering
fn write_unique(dir: &Path, prefix: &str, extension: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now()
        .format(file_names::TIMESTAMP_FORMAT)
        .to_string();

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}{}.{}", prefix, stamp, extension)
        } else {
            format!("{}{}_{}.{}", prefix, stamp, attempt, extension)
        };
        let path = dir.join(name);
        match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                io::Write::write_all(&mut file, bytes)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}
