use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use speed_camera::{SpeedCamConfig, SpeedCamError, SpeedUnit, Zone};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SPEEDCAM_CONFIG",
        "SPEEDCAM_SOURCE",
        "SPEEDCAM_DISTANCE_FT",
        "SPEEDCAM_FOV_DEG",
        "SPEEDCAM_CSV_PATH",
        "SPEEDCAM_SAVE_CSV",
        "SPEEDCAM_ZONE",
        "SPEEDCAM_UNIT",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    std::io::Write::write_all(&mut file, body.as_bytes()).expect("write config");
    file
}

fn config_error(err: &anyhow::Error) -> Option<&SpeedCamError> {
    err.downcast_ref::<SpeedCamError>()
}

#[test]
fn loads_toml_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        ".toml",
        r#"
zone = [500, 300, 100, 200]

[camera]
source = "stub://driveway"
frame_resolution = [800, 600]
frames_per_second = 25

[calibration]
distance_to_zone_feet = 50.0
field_of_view_degrees = 60.0

[detection]
min_region_area_pixels = 400
change_threshold_intensity = 20
blur_kernel_size = 9
dilate_iterations = 1

[tracking]
speed_unit = "km/h"

[output]
save_to_csv = false
csv_path = "driveway.csv"
min_speed_to_save = 5.0
"#,
    );

    std::env::set_var("SPEEDCAM_CONFIG", file.path());
    std::env::set_var("SPEEDCAM_DISTANCE_FT", "60");
    std::env::set_var("SPEEDCAM_SAVE_CSV", "true");

    let cfg = SpeedCamConfig::load().expect("load config");

    assert_eq!(cfg.source, "stub://driveway");
    assert_eq!((cfg.width, cfg.height, cfg.fps), (800, 600, 25));
    assert_eq!(cfg.distance_to_zone_feet, 60.0);
    assert_eq!(cfg.field_of_view_degrees, 60.0);
    assert_eq!(cfg.detection.min_region_area, 400);
    assert_eq!(cfg.detection.change_threshold, 20);
    assert_eq!(cfg.detection.blur_kernel_size, 9);
    assert_eq!(cfg.detection.dilate_iterations, 1);
    assert_eq!(cfg.speed_unit, SpeedUnit::Kph);
    assert!(cfg.output.save_to_csv);
    assert_eq!(cfg.output.csv_path, PathBuf::from("driveway.csv"));
    assert_eq!(cfg.output.min_speed_to_save, 5.0);
    assert_eq!(
        cfg.zone,
        Some(Zone {
            x: 100,
            y: 200,
            width: 400,
            height: 100
        })
    );
    assert_eq!(cfg.calibration().frame_width_pixels, 800);

    clear_env();
}

#[test]
fn loads_json_config_and_keeps_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        ".json",
        r#"{ "camera": { "source": "/var/lib/speedcam/frames" }, "tracking": { "min_track_secs": 0.25 } }"#,
    );
    std::env::set_var("SPEEDCAM_CONFIG", file.path());
    std::env::set_var("SPEEDCAM_ZONE", "10,20,330,140");

    let cfg = SpeedCamConfig::load().expect("load config");
    assert_eq!(cfg.source, "/var/lib/speedcam/frames");
    assert_eq!(cfg.min_track_secs, 0.25);
    assert_eq!(cfg.distance_to_zone_feet, 76.0);
    assert_eq!(cfg.detection.blur_kernel_size, 15);
    assert_eq!(
        cfg.zone,
        Some(Zone {
            x: 10,
            y: 20,
            width: 320,
            height: 120
        })
    );

    clear_env();
}

#[test]
fn no_config_file_yields_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("SPEEDCAM_SOURCE", "stub://lane");

    let cfg = SpeedCamConfig::load().expect("load defaults");
    assert_eq!(cfg.source, "stub://lane");
    assert_eq!((cfg.width, cfg.height), (640, 480));
    assert!(!cfg.output.save_to_csv);

    clear_env();
}

#[test]
fn rejects_even_blur_kernel() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(".toml", "[detection]\nblur_kernel_size = 8\n");
    std::env::set_var("SPEEDCAM_CONFIG", file.path());

    let err = SpeedCamConfig::load().unwrap_err();
    assert!(matches!(
        config_error(&err),
        Some(SpeedCamError::InvalidConfiguration(_))
    ));

    clear_env();
}

#[test]
fn rejects_degenerate_zone_and_bad_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SPEEDCAM_ZONE", "50,50,50,90");
    let err = SpeedCamConfig::load().unwrap_err();
    assert!(matches!(
        config_error(&err),
        Some(SpeedCamError::InvalidConfiguration(_))
    ));

    clear_env();
    std::env::set_var("SPEEDCAM_FOV_DEG", "wide");
    let err = SpeedCamConfig::load().unwrap_err();
    assert!(matches!(
        config_error(&err),
        Some(SpeedCamError::InvalidConfiguration(_))
    ));

    clear_env();
    std::env::set_var("SPEEDCAM_DISTANCE_FT", "-3");
    assert!(SpeedCamConfig::load().is_err());

    clear_env();
}

#[test]
fn unit_spellings_agree_across_file_and_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(".json", r#"{ "tracking": { "speed_unit": "ft/s" } }"#);
    std::env::set_var("SPEEDCAM_CONFIG", file.path());
    let cfg = SpeedCamConfig::load().expect("load config");
    assert_eq!(cfg.speed_unit, SpeedUnit::Fps);

    std::env::set_var("SPEEDCAM_UNIT", "KMH");
    let cfg = SpeedCamConfig::load().expect("load config");
    assert_eq!(cfg.speed_unit, SpeedUnit::Kph);

    std::env::set_var("SPEEDCAM_UNIT", "knots");
    let err = SpeedCamConfig::load().unwrap_err();
    assert!(matches!(
        config_error(&err),
        Some(SpeedCamError::InvalidConfiguration(_))
    ));

    clear_env();
    let file = write_config(".toml", "[tracking]\nspeed_unit = \"furlongs\"\n");
    std::env::set_var("SPEEDCAM_CONFIG", file.path());
    assert!(SpeedCamConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unknown_keys() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(".json", r#"{ "camera": { "url": "rtsp://x" } }"#);
    std::env::set_var("SPEEDCAM_CONFIG", file.path());
    let err = SpeedCamConfig::load().unwrap_err();
    assert!(matches!(
        config_error(&err),
        Some(SpeedCamError::InvalidConfiguration(_))
    ));

    clear_env();
}
