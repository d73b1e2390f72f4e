//! Image sequence frame source.
//!
//! Replays a directory of still frames (PNG or JPEG) in file-name order.
//! Capture times are synthesized from `fps`, starting at connect time.
//! The sequence does not loop; running out of files means the source is
//! unavailable.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::SpeedCamError;
use crate::frame::Frame;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub(crate) struct SequenceSource {
    dir: PathBuf,
    fps: u32,
    files: Vec<PathBuf>,
    next_index: usize,
    start: Option<SystemTime>,
    last_error: Option<String>,
}

impl SequenceSource {
    pub(crate) fn new(dir: &Path, fps: u32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fps: fps.max(1),
            files: Vec::new(),
            next_index: 0,
            start: None,
            last_error: None,
        }
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        self.files = list_frames(&self.dir)?;
        if self.files.is_empty() {
            return Err(SpeedCamError::unavailable(format!(
                "no frames found in {}",
                self.dir.display()
            ))
            .into());
        }
        self.next_index = 0;
        self.start = Some(SystemTime::now());
        log::info!(
            "CameraSource: replaying {} frames from {}",
            self.files.len(),
            self.dir.display()
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let Some(path) = self.files.get(self.next_index).cloned() else {
            return Err(SpeedCamError::unavailable(format!(
                "image sequence {} exhausted after {} frames",
                self.dir.display(),
                self.next_index
            ))
            .into());
        };
        let image = image::open(&path)
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                SpeedCamError::unavailable(format!("decode {}: {}", path.display(), err))
            })?
            .to_rgb8();

        let start = *self.start.get_or_insert_with(SystemTime::now);
        let offset = Duration::from_secs_f64(self.next_index as f64 / self.fps as f64);
        self.next_index += 1;
        Ok(Frame::new(image, start + offset))
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.last_error.is_none() && self.next_index < self.files.len()
    }

    pub(crate) fn frames_captured(&self) -> u64 {
        self.next_index as u64
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read frame directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_frame && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frames(dir: &Path, shades: &[u8]) -> Result<()> {
        for (i, shade) in shades.iter().enumerate() {
            let img = RgbImage::from_pixel(16, 8, Rgb([*shade, *shade, *shade]));
            img.save(dir.join(format!("frame_{i:04}.png")))?;
        }
        std::fs::write(dir.join("notes.txt"), "not a frame")?;
        Ok(())
    }

    #[test]
    fn replays_frames_in_name_order_then_runs_dry() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_frames(dir.path(), &[10, 20, 30])?;

        let mut source = SequenceSource::new(dir.path(), 10);
        source.connect()?;
        let shades: Vec<u8> = (0..3)
            .map(|_| source.next_frame().map(|f| f.image.get_pixel(0, 0).0[0]))
            .collect::<Result<_>>()?;
        assert_eq!(shades, vec![10, 20, 30]);
        assert!(!source.is_healthy());

        let err = source.next_frame().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpeedCamError>(),
            Some(SpeedCamError::SourceUnavailable(_))
        ));
        Ok(())
    }

    #[test]
    fn empty_directory_is_unavailable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = SequenceSource::new(dir.path(), 10);
        assert!(source.connect().is_err());
        Ok(())
    }
}
