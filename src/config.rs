use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::capture::Facing;
use crate::gate::{CooldownStart, DEFAULT_COOLDOWN};
use crate::verify::DEFAULT_CREDENTIAL_KEY;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_VERIFY_PATH: &str = "tickets/verify";
const DEFAULT_CREDENTIALS_PATH: &str = "storage.json";
const DEFAULT_CAMERA_URL: &str = "stub://front_gate";
const DEFAULT_TARGET_FPS: u32 = 15;
const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Deserialize, Default)]
struct ScannerConfigFile {
    api: Option<ApiConfigFile>,
    credentials: Option<CredentialsConfigFile>,
    camera: Option<CameraConfigFile>,
    scan: Option<ScanConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    base_url: Option<String>,
    verify_path: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CredentialsConfigFile {
    path: Option<PathBuf>,
    key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    facing: Option<Facing>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    cooldown_ms: Option<u64>,
    cooldown_start: Option<CooldownStart>,
    mark_used: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub api_base_url: String,
    pub verify_path: String,
    pub request_timeout: Duration,
    pub credentials_path: PathBuf,
    pub credential_key: String,
    pub camera: CameraSettings,
    pub scan: ScanSettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub facing: Facing,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    pub request_timeout: Duration,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CAMERA_URL.to_string(),
            facing: Facing::default(),
            target_fps: DEFAULT_TARGET_FPS,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

/// Scan loop policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub cooldown: Duration,
    pub cooldown_start: CooldownStart,
    pub mark_used: bool,
    pub facing: Facing,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            cooldown_start: CooldownStart::default(),
            mark_used: true,
            facing: Facing::default(),
        }
    }
}

impl ScannerConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CHECKIN_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScannerConfigFile) -> Self {
        let api = file.api.unwrap_or_default();
        let credentials = file.credentials.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let scan = file.scan.unwrap_or_default();

        let request_timeout =
            Duration::from_millis(api.timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS));
        let facing = camera.facing.unwrap_or_default();
        Self {
            api_base_url: api
                .base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            verify_path: api
                .verify_path
                .unwrap_or_else(|| DEFAULT_VERIFY_PATH.to_string()),
            request_timeout,
            credentials_path: credentials
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            credential_key: credentials
                .key
                .unwrap_or_else(|| DEFAULT_CREDENTIAL_KEY.to_string()),
            camera: CameraSettings {
                url: camera
                    .url
                    .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
                facing,
                target_fps: camera.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
                width: camera.width.unwrap_or(DEFAULT_FRAME_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
                request_timeout,
            },
            scan: ScanSettings {
                cooldown: scan
                    .cooldown_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_COOLDOWN),
                cooldown_start: scan.cooldown_start.unwrap_or_default(),
                mark_used: scan.mark_used.unwrap_or(true),
                facing,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = non_empty_env("CHECKIN_API_URL") {
            self.api_base_url = url;
        }
        if let Some(path) = non_empty_env("CHECKIN_VERIFY_PATH") {
            self.verify_path = path;
        }
        if let Some(path) = non_empty_env("CHECKIN_CREDENTIALS_PATH") {
            self.credentials_path = PathBuf::from(path);
        }
        if let Some(key) = non_empty_env("CHECKIN_CREDENTIAL_KEY") {
            self.credential_key = key;
        }
        if let Some(url) = non_empty_env("CHECKIN_CAMERA_URL") {
            self.camera.url = url;
        }
        if let Some(fps) = non_empty_env("CHECKIN_TARGET_FPS") {
            self.camera.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("CHECKIN_TARGET_FPS must be an integer frame rate"))?;
        }
        if let Some(cooldown) = non_empty_env("CHECKIN_COOLDOWN_MS") {
            let millis: u64 = cooldown.parse().map_err(|_| {
                anyhow!("CHECKIN_COOLDOWN_MS must be an integer number of milliseconds")
            })?;
            self.scan.cooldown = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        Url::parse(&self.api_base_url)
            .map_err(|e| anyhow!("invalid api base url '{}': {}", self.api_base_url, e))?;
        Url::parse(&self.camera.url)
            .map_err(|e| anyhow!("invalid camera url '{}': {}", self.camera.url, e))?;
        if self.verify_path.trim().is_empty() {
            return Err(anyhow!("verify path must not be empty"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("api timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Delay between frame callbacks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis((1000 / self.camera.target_fps.max(1)).max(1) as u64)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<ScannerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_door_policy() {
        let cfg = ScannerConfig::from_file(ScannerConfigFile::default());
        assert_eq!(cfg.scan.cooldown, Duration::from_millis(1200));
        assert_eq!(cfg.scan.cooldown_start, CooldownStart::AfterCompletion);
        assert!(cfg.scan.mark_used);
        assert_eq!(cfg.camera.facing, Facing::Environment);
        assert_eq!(cfg.credential_key, "token");
        assert_eq!(cfg.frame_interval(), Duration::from_millis(66));
    }

    #[test]
    fn zero_fps_is_rejected() {
        let mut cfg = ScannerConfig::from_file(ScannerConfigFile::default());
        cfg.camera.target_fps = 0;
        assert!(cfg.validate().is_err());
    }
}
