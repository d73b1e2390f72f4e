use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use speed_camera::{RunStats, SpeedRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Terminal feedback for startup stages and the running frame loop.
#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self { mode, is_tty }
    }

    fn pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = spinner("{spinner} {msg}");
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Live frame counter; `None` in plain mode, where the log carries it.
    pub fn monitor(&self) -> Option<RunMonitor> {
        if !self.pretty() {
            return None;
        }
        let bar = spinner("{spinner} {elapsed} {msg}");
        bar.set_message("waiting for frames");
        Some(RunMonitor {
            bar,
            last_speed: None,
        })
    }
}

fn spinner(template: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style =
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

pub struct RunMonitor {
    bar: ProgressBar,
    last_speed: Option<String>,
}

impl RunMonitor {
    pub fn observe(&mut self, stats: &RunStats, record: Option<&SpeedRecord>) {
        if let Some(record) = record {
            self.last_speed = Some(format!("{:.1} {}", record.speed, record.unit));
        }
        let last = self.last_speed.as_deref().unwrap_or("-");
        self.bar.set_message(format!(
            "{} frames, {} tracks, last {}",
            stats.frames, stats.tracks_started, last
        ));
    }

    pub fn finish(self, stats: &RunStats) {
        self.bar.finish_with_message(format!(
            "✔ {} frames, {} estimates",
            stats.frames, stats.estimates
        ));
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
