use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::credentials::{Consumer, Credentials};
use crate::error::{ConfigError, ConfigResult};

/// The application's credentials file.
///
/// A JSON object holding the consumer key pair and, once a user has
/// authorized, their access pair for reuse across runs. Read once at
/// startup; rewritten after a first-time authorization. Empty token strings
/// count as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_secret: Option<String>,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Rewrite the file, pretty-printed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Malformed {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, raw).map_err(|source| ConfigError::Unwritable {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn consumer(&self) -> Consumer {
        Consumer::new(self.consumer_key.clone(), self.consumer_secret.clone())
    }

    /// The persisted access pair, if both halves are present and non-empty.
    pub fn access_credentials(&self) -> Option<Credentials> {
        match (&self.access_token, &self.access_secret) {
            (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(token.clone(), secret.clone()))
            }
            _ => None,
        }
    }

    /// Record a freshly obtained access pair for the next run.
    pub fn remember_access(&mut self, credentials: &Credentials) {
        self.access_token = Some(credentials.token.clone());
        self.access_secret = Some(credentials.secret.clone());
    }

    /// Drop the persisted access pair (logout).
    pub fn forget_access(&mut self) {
        self.access_token = None;
        self.access_secret = None;
    }
}
