use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// A token / secret pair.
///
/// The same shape serves both lifetimes the protocol knows: temporary
/// credentials issued at the start of the handshake and access credentials
/// issued once the user approves. Both are opaque strings to this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub secret: String,
}

impl Credentials {
    pub fn new<T, S>(token: T, secret: S) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        Credentials {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

/// The application's identity at the remote service, issued out-of-band.
///
/// Read once at startup and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
}

impl Consumer {
    pub fn new<K, S>(key: K, secret: S) -> Self
    where
        K: Into<String>,
        S: Into<String>,
    {
        Consumer {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// Shared in-memory map from token to secret.
///
/// Cloning yields another handle to the same map, so a server can hand one
/// instance to every request handler. All operations take the single lock;
/// absence of a key is a normal outcome, not an error. A real deployment
/// would back this with a database.
#[derive(Clone, Debug, Default)]
pub struct CredentialStore {
    secrets: Arc<Mutex<HashMap<String, String>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by token.
    pub fn put(&self, credentials: &Credentials) {
        let mut secrets = self.secrets.lock().unwrap();
        secrets.insert(credentials.token.clone(), credentials.secret.clone());
    }

    pub fn get(&self, token: &str) -> Option<Credentials> {
        let secrets = self.secrets.lock().unwrap();
        secrets
            .get(token)
            .map(|secret| Credentials::new(token, secret.clone()))
    }

    /// Remove if present; no-op otherwise.
    pub fn delete(&self, token: &str) {
        let mut secrets = self.secrets.lock().unwrap();
        secrets.remove(token);
    }

    pub fn len(&self) -> usize {
        self.secrets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
