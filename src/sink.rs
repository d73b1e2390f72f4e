//! Speed record sinks.
//!
//! Sinks take ownership of each `SpeedRecord`; the core keeps no copy.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::frame::epoch_seconds;
use crate::speed::SpeedRecord;

pub trait SpeedSink {
    fn accept(&mut self, record: SpeedRecord) -> Result<()>;

    /// Push buffered output to its destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Logs each estimate at info level.
#[derive(Default)]
pub struct LogSink;

impl SpeedSink for LogSink {
    fn accept(&mut self, record: SpeedRecord) -> Result<()> {
        log::info!(
            "speed {:.2} {} {} ({} px in {:.2}s)",
            record.speed,
            record.unit,
            record.direction.as_str(),
            record.pixels,
            record.elapsed_secs
        );
        Ok(())
    }
}

/// Appends `timestamp,speed,unit` lines to a CSV file.
///
/// Records slower than `min_speed` are dropped. The timestamp is seconds
/// since the Unix epoch with millisecond precision.
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
    min_speed: f64,
    written: u64,
}

impl CsvSink {
    pub fn open(path: impl AsRef<Path>, min_speed: f64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open speed log {}", path.display()))?;
        log::info!("recording speeds to {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            min_speed,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

pub fn format_csv_line(record: &SpeedRecord) -> String {
    format!(
        "{:.3},{:.2},{}",
        epoch_seconds(record.timestamp),
        record.speed,
        record.unit
    )
}

impl SpeedSink for CsvSink {
    fn accept(&mut self, record: SpeedRecord) -> Result<()> {
        if record.speed < self.min_speed {
            return Ok(());
        }
        writeln!(self.writer, "{}", format_csv_line(&record))
            .and_then(|_| self.writer.flush())
            .with_context(|| format!("append to {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))
    }
}

/// Fans each record out to several sinks.
///
/// A failing sink is logged and skipped; it never stops the others.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn SpeedSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl SpeedSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn SpeedSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl SpeedSink for SinkSet {
    fn accept(&mut self, record: SpeedRecord) -> Result<()> {
        for sink in &mut self.sinks {
            if let Err(e) = sink.accept(record) {
                log::warn!("speed sink failed: {:#}", e);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                log::warn!("speed sink flush failed: {:#}", e);
            }
        }
        Ok(())
    }
}
