//! Frame ingestion sources.
//!
//! This module provides the sources the processing loop can pull from:
//! - Synthetic road scene (`stub://`, demos and tests)
//! - Directories of still frames (offline replay)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! Every source hands out `Frame`s carrying the capture timestamp used for
//! speed estimation. Sources do not retain frames after handing them out.

pub mod camera;
#[cfg(any(test, feature = "ingest-v4l2"))]
#[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
mod normalize;
mod sequence;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use camera::{CameraConfig, CameraSource, CameraStats};
pub use synthetic::SyntheticScene;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Config;
