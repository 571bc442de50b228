//! Session persistence
//!
//! The session (token pair plus the minimal user profile) is owned by a single
//! [`SessionStore`]. The API client and the auth service share it through an
//! `Arc`; nothing else reads tokens directly.
//!
//! The backing file is optional. An in-memory store never touches disk, which
//! is what the tests and one-shot scripted runs use.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::protocol::types::{AuthResponse, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self {
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
            expires_at: Some(auth.expires_at),
            user: Some(auth.user),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
    state: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`.
    ///
    /// A missing file is an empty session. A file that cannot be parsed is
    /// removed and also treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Session>(&content) {
                Ok(session) => {
                    log::debug!("Loaded session from {}", path.display());
                    Some(session)
                }
                Err(err) => {
                    log::warn!(
                        "Discarding unreadable session file {}: {err}",
                        path.display()
                    );
                    remove_file_if_exists(&path)?;
                    None
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read session file {}", path.display()))
            }
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().as_ref().map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().as_ref().map(|s| s.refresh_token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().as_ref().and_then(|s| s.user.clone())
    }

    /// Replace the whole session and persist it.
    pub fn set(&self, session: Session) -> Result<()> {
        *self.state.write() = Some(session);
        self.save()
    }

    /// Swap in a refreshed token pair, keeping the stored user.
    pub fn update_tokens(
        &self,
        access_token: String,
        refresh_token: String,
        expires_at: Option<String>,
    ) -> Result<()> {
        {
            let mut guard = self.state.write();
            match guard.as_mut() {
                Some(session) => {
                    session.access_token = access_token;
                    session.refresh_token = refresh_token;
                    if expires_at.is_some() {
                        session.expires_at = expires_at;
                    }
                }
                None => {
                    *guard = Some(Session {
                        access_token,
                        refresh_token,
                        expires_at,
                        user: None,
                    })
                }
            }
        }
        self.save()
    }

    pub fn set_user(&self, user: User) -> Result<()> {
        if let Some(session) = self.state.write().as_mut() {
            session.user = Some(user);
        }
        self.save()
    }

    /// Write the current state to disk. An empty state removes the file.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot = self.state.read().clone();
        match snapshot {
            Some(session) => {
                let json = serde_json::to_string_pretty(&session)?;
                write_private(path, json.as_bytes())
                    .with_context(|| format!("Failed to write session file {}", path.display()))
            }
            None => remove_file_if_exists(path),
        }
    }

    /// Drop the session from memory and disk. Clearing twice is a no-op.
    pub fn clear(&self) -> Result<()> {
        *self.state.write() = None;
        self.save()
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to remove session file {}", path.display()))
        }
    }
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.flush()
}
