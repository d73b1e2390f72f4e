//! speedcam - single-zone vehicle speed camera
//!
//! 1. Loads configuration (file named by SPEEDCAM_CONFIG, env, flags)
//! 2. Connects the frame source and picks the monitored zone
//! 3. Derives feet-per-pixel from the camera geometry
//! 4. Runs detect -> track -> estimate until Ctrl-C, --max-frames, or the
//!    source goes away

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use speed_camera::error::classify;
use speed_camera::{
    CalibrationUi, CameraSource, ChangeDetector, CsvSink, FrameSource, LogSink, PointerScript,
    PreviewWriter, SinkSet, SpeedCamConfig, SpeedCamError, SpeedCamera, SpeedEstimator,
    SpeedTracker, SpeedUnit, Zone,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (TOML or JSON).
    #[arg(long, env = "SPEEDCAM_CONFIG")]
    config: Option<PathBuf>,
    /// Frame source: stub://name, /dev/videoN, or a directory of frames.
    #[arg(long)]
    source: Option<String>,
    /// Monitored zone as x1,y1,x2,y2 (any corner order).
    #[arg(long)]
    zone: Option<String>,
    /// Append estimates to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write the annotated frame to this PNG after every frame.
    #[arg(long)]
    preview: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Speed unit: mph, kph (km/h), or fps (ft/s).
    #[arg(long)]
    unit: Option<SpeedUnit>,
    /// Pace synthetic frames in wall-clock time.
    #[arg(long)]
    realtime: bool,
    /// Terminal UI mode: auto, pretty, or plain.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = SpeedCamConfig::load_from(args.config.as_deref())?;
        apply_args(&mut cfg, &args)?;
        cfg.validate()?;
        cfg
    };

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("install Ctrl-C handler")?;

    let mut source = {
        let _stage = ui.stage("Connect frame source");
        let mut camera = cfg.camera();
        camera.realtime = args.realtime;
        let mut source = CameraSource::new(camera)?;
        source.connect()?;
        source
    };

    let (zone, frame_width) = {
        let _stage = ui.stage("Select zone");
        let first = source.next_frame()?;
        let requested = match cfg.zone {
            Some(zone) => zone,
            None => default_zone(first.width(), first.height())?,
        };
        let zone = PointerScript::for_zone(requested).select_zone(&first)?;
        (zone, first.width())
    };

    // Scale comes from the delivered frame, which may differ from the
    // requested resolution on real devices.
    let mut calibration = cfg.calibration();
    calibration.frame_width_pixels = frame_width;
    let feet_per_pixel = calibration.feet_per_pixel()?;
    log::info!(
        "{:.5} ft/px ({} ft at {} deg over {} px)",
        feet_per_pixel,
        calibration.distance_to_zone_feet,
        calibration.field_of_view_degrees,
        frame_width
    );

    let detector = ChangeDetector::new(zone, cfg.detection.clone())?;
    let tracker = SpeedTracker::with_min_track_secs(
        SpeedEstimator::new(feet_per_pixel, cfg.speed_unit),
        cfg.min_track_secs,
    );

    let mut sinks = SinkSet::new().with(LogSink);
    if cfg.output.save_to_csv {
        sinks.push(Box::new(CsvSink::open(
            &cfg.output.csv_path,
            cfg.output.min_speed_to_save,
        )?));
    }

    let mut camera = SpeedCamera::new(source, detector, tracker, sinks);
    if cfg.output.show_preview {
        log::info!("preview written to {}", cfg.output.preview_path.display());
        camera = camera.with_preview(PreviewWriter::new(&cfg.output.preview_path, zone));
    }

    let outcome = match ui.monitor() {
        Some(mut monitor) => {
            let outcome = camera.run_observed(&stop, args.max_frames, |stats, record| {
                monitor.observe(stats, record)
            });
            monitor.finish(&camera.stats());
            outcome
        }
        None => camera.run(&stop, args.max_frames),
    };
    let stats = match outcome {
        Ok(stats) => stats,
        Err(err) => {
            if let Some(SpeedCamError::SourceUnavailable(_)) = classify(&err) {
                log::error!(
                    "frame source {} lost after {} frames (healthy: {}), {} estimates",
                    camera.source().stats().source,
                    camera.stats().frames,
                    camera.source().is_healthy(),
                    camera.stats().estimates
                );
            }
            return Err(err);
        }
    };

    log::info!(
        "done: {} frames from {} ({} captured), {} with motion, {} tracks, {} estimates",
        stats.frames,
        camera.source().stats().source,
        camera.source().stats().frames_captured,
        stats.motion_frames,
        stats.tracks_started,
        stats.estimates
    );
    Ok(())
}

fn apply_args(cfg: &mut SpeedCamConfig, args: &Args) -> Result<()> {
    if let Some(source) = &args.source {
        cfg.source = source.clone();
    }
    if let Some(zone) = &args.zone {
        cfg.zone = Some(Zone::parse(zone)?);
    }
    if let Some(unit) = args.unit {
        cfg.speed_unit = unit;
    }
    if let Some(csv) = &args.csv {
        cfg.output.save_to_csv = true;
        cfg.output.csv_path = csv.clone();
    }
    if let Some(preview) = &args.preview {
        cfg.output.show_preview = true;
        cfg.output.preview_path = preview.clone();
    }
    Ok(())
}

/// Middle third of the frame height across the central three quarters of
/// its width.
fn default_zone(width: u32, height: u32) -> Result<Zone> {
    let zone = Zone::from_corners(
        (width / 8, height / 3),
        (width - width / 8, height - height / 3),
    )?;
    log::info!(
        "no zone configured, using {},{} {}x{}",
        zone.x,
        zone.y,
        zone.width,
        zone.height
    );
    Ok(zone)
}
