use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use checkin_scanner::config::ScannerConfig;
use checkin_scanner::{CooldownStart, Facing};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "CHECKIN_CONFIG",
        "CHECKIN_API_URL",
        "CHECKIN_VERIFY_PATH",
        "CHECKIN_CREDENTIALS_PATH",
        "CHECKIN_CREDENTIAL_KEY",
        "CHECKIN_CAMERA_URL",
        "CHECKIN_TARGET_FPS",
        "CHECKIN_COOLDOWN_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "api": {
            "base_url": "https://tickets.example.com/api",
            "verify_path": "checkin/verify",
            "timeout_ms": 4000
        },
        "credentials": {
            "path": "/var/lib/checkin/storage.json",
            "key": "authToken"
        },
        "camera": {
            "url": "stub://side_door?codes=T1",
            "facing": "user",
            "target_fps": 30,
            "width": 800,
            "height": 600
        },
        "scan": {
            "cooldown_ms": 2000,
            "cooldown_start": "after_dispatch",
            "mark_used": false
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("CHECKIN_CONFIG", file.path());
    std::env::set_var("CHECKIN_CAMERA_URL", "stub://main_door");
    std::env::set_var("CHECKIN_COOLDOWN_MS", "1500");

    let cfg = ScannerConfig::load().expect("load config");

    assert_eq!(cfg.api_base_url, "https://tickets.example.com/api");
    assert_eq!(cfg.verify_path, "checkin/verify");
    assert_eq!(cfg.request_timeout, Duration::from_millis(4000));
    assert_eq!(
        cfg.credentials_path.to_str(),
        Some("/var/lib/checkin/storage.json")
    );
    assert_eq!(cfg.credential_key, "authToken");
    assert_eq!(cfg.camera.url, "stub://main_door");
    assert_eq!(cfg.camera.facing, Facing::User);
    assert_eq!(cfg.camera.target_fps, 30);
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert_eq!(cfg.scan.cooldown, Duration::from_millis(1500));
    assert_eq!(cfg.scan.cooldown_start, CooldownStart::AfterDispatch);
    assert!(!cfg.scan.mark_used);
    assert_eq!(cfg.scan.facing, Facing::User);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [api]
        base_url = "http://10.0.0.5:8080"

        [scan]
        cooldown_ms = 800
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("CHECKIN_CONFIG", file.path());

    let cfg = ScannerConfig::load().expect("load config");
    assert_eq!(cfg.api_base_url, "http://10.0.0.5:8080");
    assert_eq!(cfg.scan.cooldown, Duration::from_millis(800));
    assert_eq!(cfg.scan.cooldown_start, CooldownStart::AfterCompletion);
    assert!(cfg.scan.mark_used);

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("CHECKIN_COOLDOWN_MS", "soon");
    let err = ScannerConfig::load().expect_err("invalid cooldown");
    assert!(err.to_string().contains("CHECKIN_COOLDOWN_MS"));
    clear_env();

    std::env::set_var("CHECKIN_API_URL", "not a url");
    assert!(ScannerConfig::load().is_err());
    clear_env();

    std::env::set_var("CHECKIN_TARGET_FPS", "0");
    let err = ScannerConfig::load().expect_err("zero fps");
    assert!(err.to_string().contains("target_fps"));

    clear_env();
}
