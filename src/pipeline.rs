//! Processing loop.
//!
//! One frame at a time: acquire, detect, track, emit, optionally render.
//! The loop owns the background model (inside the detector) and the track
//! state (inside the tracker); nothing is shared across threads. The stop
//! flag is checked once per iteration.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::annotate::PreviewWriter;
use crate::detect::MotionDetector;
use crate::frame::FrameSource;
use crate::sink::SpeedSink;
use crate::speed::SpeedRecord;
use crate::tracker::SpeedTracker;

/// Counters reported when a run ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub motion_frames: u64,
    pub tracks_started: u64,
    pub estimates: u64,
}

pub struct SpeedCamera<S, D, K> {
    source: S,
    detector: D,
    tracker: SpeedTracker,
    sink: K,
    preview: Option<PreviewWriter>,
    stats: RunStats,
}

impl<S, D, K> SpeedCamera<S, D, K>
where
    S: FrameSource,
    D: MotionDetector,
    K: SpeedSink,
{
    pub fn new(source: S, detector: D, tracker: SpeedTracker, sink: K) -> Self {
        Self {
            source,
            detector,
            tracker,
            sink,
            preview: None,
            stats: RunStats::default(),
        }
    }

    /// Write an annotated frame to disk after every processed frame.
    pub fn with_preview(mut self, preview: PreviewWriter) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tracker(&self) -> &SpeedTracker {
        &self.tracker
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Process exactly one frame.
    ///
    /// Source errors propagate untouched; a sink error is logged and the
    /// record is still returned.
    pub fn step(&mut self) -> Result<Option<SpeedRecord>> {
        let frame = self.source.next_frame()?;
        let event = self.detector.process(&frame)?;
        self.stats.frames += 1;
        if event.found {
            self.stats.motion_frames += 1;
        }

        if let Some(preview) = &self.preview {
            if let Err(e) = preview.write(&frame.image, event.region) {
                log::warn!("preview write to {} failed: {:#}", preview.path().display(), e);
            }
        }

        let record = self.tracker.update(&event);
        self.stats.tracks_started = self.tracker.tracks_started();
        if let Some(record) = record {
            self.stats.estimates += 1;
            if let Err(e) = self.sink.accept(record) {
                log::warn!("speed sink rejected record: {:#}", e);
            }
        }
        Ok(record)
    }

    /// Run until `stop` is raised, `max_frames` frames have been processed,
    /// or the source fails. Sinks are flushed on every exit path.
    pub fn run(&mut self, stop: &AtomicBool, max_frames: Option<u64>) -> Result<RunStats> {
        self.run_observed(stop, max_frames, |_, _| {})
    }

    /// Like `run`, calling `observe` after every processed frame.
    pub fn run_observed<F>(
        &mut self,
        stop: &AtomicBool,
        max_frames: Option<u64>,
        mut observe: F,
    ) -> Result<RunStats>
    where
        F: FnMut(&RunStats, Option<&SpeedRecord>),
    {
        log::info!("{} detector running", self.detector.name());
        let outcome = self.run_inner(stop, max_frames, &mut observe);
        if let Err(e) = self.sink.flush() {
            log::warn!("flush speed sinks: {:#}", e);
        }
        outcome?;
        Ok(self.stats)
    }

    fn run_inner<F>(
        &mut self,
        stop: &AtomicBool,
        max_frames: Option<u64>,
        observe: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&RunStats, Option<&SpeedRecord>),
    {
        loop {
            if stop.load(Ordering::SeqCst) {
                log::info!("stop requested after {} frames", self.stats.frames);
                return Ok(());
            }
            if max_frames.is_some_and(|max| self.stats.frames >= max) {
                log::debug!("frame limit reached");
                return Ok(());
            }
            let record = self.step()?;
            observe(&self.stats, record.as_ref());
            if self.stats.frames % 300 == 0 {
                log::debug!(
                    "{} frames, {} with motion, {} estimates",
                    self.stats.frames,
                    self.stats.motion_frames,
                    self.stats.estimates
                );
            }
        }
    }
}
