use serde_json::Value;
use std::path::{Path, PathBuf};

/// Key the bearer token is stored under.
pub const DEFAULT_CREDENTIAL_KEY: &str = "token";

/// Source of the operator's bearer credential.
pub trait CredentialStore: Send + Sync {
    /// Current token, or `None` when nobody is signed in.
    fn token(&self) -> Option<String>;
}

/// Key-value JSON file holding the signed-in session (`{"token": "...", "user": {...}}`).
///
/// The file is read on every call so a sign-out elsewhere takes effect on
/// the next scan.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    key: String,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn token(&self) -> Option<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no credential file at {}", self.path.display());
                return None;
            }
            Err(err) => {
                log::warn!(
                    "failed to read credential file {}: {}",
                    self.path.display(),
                    err
                );
                return None;
            }
        };
        let store: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("invalid credential file {}: {}", self.path.display(), err);
                return None;
            }
        };
        store
            .get(&self.key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}

/// Fixed credential, e.g. passed on the command line.
#[derive(Clone, Default)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|token| !token.trim().is_empty()))
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.0.is_some() { "set" } else { "unset" };
        f.debug_tuple("StaticCredential").field(&state).finish()
    }
}

impl CredentialStore for StaticCredential {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}
