//! Named analysis sessions and their storage handles.
//!
//! A session maps a user-chosen name to the Parquet path holding that session's
//! imported records. At most one session is active at a time; `import`, `query`
//! and `stats` all operate on the active one. The registry is a single JSON file
//! (`logsieve_sessions.json`) in a caller-supplied directory, the OS temp
//! directory by default.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SieveError, SieveResult};

const REGISTRY_FILE: &str = "logsieve_sessions.json";
const MAX_NAME_LEN: usize = 63;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Inactive,
}

/// One named session and its storage handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub store_path: PathBuf,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File-backed registry of sessions, keyed by name.
pub struct SessionRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionRegistry {
    /// Open the registry stored under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(REGISTRY_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Open the registry in the OS temp directory.
    pub fn default_location() -> Self {
        Self::open(std::env::temp_dir())
    }

    /// Register a new session and make it the active one.
    ///
    /// The name is sanitized to `[a-z0-9_]` first; registering an already-known
    /// name is an error.
    pub fn create(&self, name: &str, store_path: PathBuf) -> SieveResult<Session> {
        let name = sanitize_name(name)?;
        let _guard = self.lock.lock().expect("registry mutex poisoned");

        let mut sessions = self.read()?;
        if sessions.iter().any(|s| s.name == name) {
            return Err(SieveError::Session {
                message: format!("session '{name}' already exists"),
            });
        }

        let now = Utc::now();
        deactivate_all(&mut sessions, now);
        let session = Session {
            name,
            store_path,
            state: SessionState::Active,
            created_at: now,
            updated_at: now,
        };
        sessions.push(session.clone());
        self.write(&sessions)?;
        Ok(session)
    }

    /// Make the named session active, deactivating any other.
    pub fn attach(&self, name: &str) -> SieveResult<Session> {
        let name = sanitize_name(name)?;
        let _guard = self.lock.lock().expect("registry mutex poisoned");

        let mut sessions = self.read()?;
        if !sessions.iter().any(|s| s.name == name) {
            return Err(SieveError::Session {
                message: format!("session '{name}' not found"),
            });
        }

        let now = Utc::now();
        deactivate_all(&mut sessions, now);
        let mut attached = None;
        for session in sessions.iter_mut() {
            if session.name == name {
                session.state = SessionState::Active;
                session.updated_at = now;
                attached = Some(session.clone());
            }
        }
        self.write(&sessions)?;
        Ok(attached.expect("session checked present above"))
    }

    /// The currently active session.
    pub fn active(&self) -> SieveResult<Session> {
        let _guard = self.lock.lock().expect("registry mutex poisoned");
        self.read()?
            .into_iter()
            .find(|s| s.state == SessionState::Active)
            .ok_or(SieveError::Session {
                message: "no active session; create or attach one first".to_string(),
            })
    }

    /// All known sessions, in registration order.
    pub fn list(&self) -> SieveResult<Vec<Session>> {
        let _guard = self.lock.lock().expect("registry mutex poisoned");
        self.read()
    }

    /// Remove the active session from the registry and return it.
    ///
    /// The session's store file is the caller's to delete; the registry only
    /// forgets the name.
    pub fn kill(&self) -> SieveResult<Session> {
        let _guard = self.lock.lock().expect("registry mutex poisoned");

        let mut sessions = self.read()?;
        let idx = sessions
            .iter()
            .position(|s| s.state == SessionState::Active)
            .ok_or(SieveError::Session {
                message: "no active session to kill".to_string(),
            })?;
        let killed = sessions.remove(idx);
        self.write(&sessions)?;
        Ok(killed)
    }

    fn read(&self) -> SieveResult<Vec<Session>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, sessions: &[Session]) -> SieveResult<()> {
        let raw = serde_json::to_string_pretty(sessions)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

fn deactivate_all(sessions: &mut [Session], now: DateTime<Utc>) {
    for session in sessions.iter_mut() {
        if session.state == SessionState::Active {
            session.state = SessionState::Inactive;
            session.updated_at = now;
        }
    }
}

/// Normalize a session name: lowercase, non-`[a-z0-9_]` replaced with `_`, a
/// leading underscore added when the name would start with a digit, truncated to
/// 63 characters. Only an empty name is rejected.
pub fn sanitize_name(name: &str) -> SieveResult<String> {
    let mut sanitized: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        return Err(SieveError::Session {
            message: "session name is empty".to_string(),
        });
    }
    if sanitized.as_bytes()[0].is_ascii_digit() {
        sanitized.insert(0, '_');
    }
    sanitized.truncate(MAX_NAME_LEN);
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::sanitize_name;

    #[test]
    fn sanitize_lowercases_and_replaces() {
        assert_eq!(sanitize_name("My Session!").unwrap(), "my_session_");
        assert_eq!(sanitize_name("prod-logs").unwrap(), "prod_logs");
        assert_eq!(sanitize_name("ok_name_1").unwrap(), "ok_name_1");
    }

    #[test]
    fn sanitize_prefixes_leading_digit() {
        assert_eq!(sanitize_name("2024runs").unwrap(), "_2024runs");
    }

    #[test]
    fn sanitize_rejects_empty_and_truncates_long() {
        assert!(sanitize_name("").is_err());
        let long = "a".repeat(100);
        assert_eq!(sanitize_name(&long).unwrap().len(), 63);
    }
}
