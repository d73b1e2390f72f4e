//! Single-zone vehicle speed camera.
//!
//! A fixed camera watches one rectangle of road. Each frame is differenced
//! against a background model; the largest changed region is tracked across
//! frames, and once a track has lasted long enough its horizontal pixel
//! displacement is turned into a real-world speed using the camera geometry.
//!
//! # Module Structure
//!
//! - `frame`, `ingest`: frames and the sources that produce them
//! - `zone`: the monitored rectangle and how an operator picks it
//! - `detect`: background model, frame differencing, region extraction
//! - `calibration`: feet-per-pixel from field of view and distance
//! - `tracker`, `speed`: track state machine and speed estimation
//! - `sink`: where speed records go (log, CSV)
//! - `pipeline`: the single-threaded processing loop
//! - `annotate`: preview rendering
//! - `config`, `error`: startup configuration and fatal error kinds

pub mod annotate;
pub mod calibration;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod sink;
pub mod speed;
pub mod tracker;
pub mod zone;

pub use annotate::PreviewWriter;
pub use calibration::{compute_feet_per_pixel, CalibrationParams};
pub use config::{OutputSettings, SpeedCamConfig};
pub use detect::{
    BackgroundModel, BoundingBox, ChangeDetector, DetectorSettings, MotionDetector, MotionEvent,
};
pub use error::SpeedCamError;
pub use frame::{Frame, FrameSource};
pub use ingest::{CameraConfig, CameraSource, CameraStats, SyntheticScene};
pub use pipeline::{RunStats, SpeedCamera};
pub use sink::{CsvSink, LogSink, SinkSet, SpeedSink};
pub use speed::{estimate_speed, Direction, SpeedEstimator, SpeedRecord, SpeedUnit};
pub use tracker::{SpeedTracker, TrackPhase};
pub use zone::{CalibrationSession, CalibrationUi, PointerEvent, PointerScript, Zone};
