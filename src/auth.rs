use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// API credentials and the opaque session string issued at login.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub session: Option<String>,
}

impl Credentials {
    pub fn api(&self) -> Option<(i32, &str)> {
        let api_hash = self.api_hash.as_deref().filter(|hash| !hash.trim().is_empty())?;
        self.api_id.map(|api_id| (api_id, api_hash))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SecretsFile {
    #[serde(flatten)]
    credentials: Credentials,
    gateway_url: Option<String>,
    updated_at: Option<i64>,
}

pub struct AuthStore {
    path: PathBuf,
    gateway_url: String,
}

impl AuthStore {
    pub fn new(path: PathBuf, gateway_url: String) -> Self {
        Self { path, gateway_url }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored credentials; `TELEGRAM_SESSION` replaces the stored session.
    pub fn load(&self) -> Result<Credentials, AuthError> {
        let mut credentials = self.load_file()?;
        if let Ok(session) = env::var("TELEGRAM_SESSION") {
            if !session.trim().is_empty() {
                credentials.session = Some(session);
            }
        }
        Ok(credentials)
    }

    pub fn store(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }

        let secrets = SecretsFile {
            credentials: credentials.clone(),
            gateway_url: Some(self.gateway_url.clone()),
            updated_at: Some(current_epoch_seconds() as i64),
        };
        let payload = serde_json::to_string_pretty(&secrets)?;
        fs::write(&self.path, payload)?;
        set_file_permissions(&self.path, 0o600)?;
        Ok(())
    }

    /// Forgets the session but keeps the API credentials for the next login.
    pub fn clear_session(&self) -> Result<(), AuthError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut credentials = self.load_file()?;
        credentials.session = None;
        self.store(&credentials)
    }

    fn load_file(&self) -> Result<Credentials, AuthError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Credentials::default()),
            Err(err) => return Err(AuthError::Io(err)),
        };

        let secrets: SecretsFile = serde_json::from_str(&contents)?;
        if let Some(gateway_url) = secrets.gateway_url.as_deref() {
            if gateway_url != self.gateway_url {
                return Ok(Credentials::default());
            }
        }
        Ok(secrets.credentials)
    }
}

fn ensure_dir(path: &Path) -> Result<(), io::Error> {
    fs::create_dir_all(path)?;
    set_dir_permissions(path, 0o700)?;
    Ok(())
}

fn current_epoch_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(unix)]
fn set_file_permissions(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    let perm = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, perm)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    let perm = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, perm)
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}
