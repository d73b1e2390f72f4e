//! Camera frame source.
//!
//! `CameraSource` picks a backend from the source string:
//! - `stub://...` synthetic road scene
//! - `/dev/...` V4L2 device (feature: ingest-v4l2)
//! - anything else is a directory of still frames replayed in order

use anyhow::Result;
use std::path::Path;

#[cfg(feature = "ingest-v4l2")]
use super::v4l2::{V4l2Config, V4l2Source};
use super::{sequence::SequenceSource, synthetic::SyntheticScene, synthetic::SyntheticSource};
use crate::error::SpeedCamError;
use crate::frame::{Frame, FrameSource};

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// `stub://name`, `/dev/videoN`, or a frame directory.
    pub source: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Sleep between synthetic frames to match `target_fps`.
    pub realtime: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "stub://road".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
            realtime: false,
        }
    }
}

pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticSource),
    Sequence(SequenceSource),
    #[cfg(feature = "ingest-v4l2")]
    V4l2(V4l2Source),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.source.trim().is_empty() {
            return Err(SpeedCamError::invalid("camera source must not be empty").into());
        }
        if config.source.starts_with("stub://") {
            let scene = SyntheticScene {
                width: config.width,
                height: config.height,
                fps: config.target_fps,
                pace: config.realtime,
                ..SyntheticScene::default()
            };
            return Ok(Self::synthetic(&config.source, scene));
        }
        if config.source.starts_with("/dev/") {
            #[cfg(feature = "ingest-v4l2")]
            {
                return Ok(Self {
                    backend: CameraBackend::V4l2(V4l2Source::new(V4l2Config {
                        device: config.source.clone(),
                        target_fps: config.target_fps,
                        width: config.width,
                        height: config.height,
                    })),
                });
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                return Err(SpeedCamError::invalid(
                    "camera devices require the ingest-v4l2 feature",
                )
                .into());
            }
        }
        if config.source.contains("://") {
            return Err(SpeedCamError::invalid(format!(
                "unsupported camera source {}",
                config.source
            ))
            .into());
        }
        Ok(Self {
            backend: CameraBackend::Sequence(SequenceSource::new(
                Path::new(&config.source),
                config.target_fps,
            )),
        })
    }

    /// Synthetic source with an explicit scene.
    pub fn synthetic(label: &str, scene: SyntheticScene) -> Self {
        Self {
            backend: CameraBackend::Synthetic(SyntheticSource::new(label, scene)),
        }
    }

    /// Open the underlying device or directory.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            CameraBackend::Sequence(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => source.connect(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(_) => true,
            CameraBackend::Sequence(source) => source.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => CameraStats {
                frames_captured: source.frames_captured(),
                source: source.label().to_string(),
            },
            CameraBackend::Sequence(source) => CameraStats {
                frames_captured: source.frames_captured(),
                source: source.dir().display().to_string(),
            },
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => CameraStats {
                frames_captured: source.frames_captured(),
                source: source.device().to_string(),
            },
        }
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            CameraBackend::Sequence(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => source.next_frame(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub source: String,
}
