//! Single-secret bearer token storage.
//!
//! At most one token exists at a time; absence means unauthenticated.
//! Storage errors propagate to the caller and are never retried here.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};

/// Scoped access to the one persisted credential.
pub trait TokenStore: Send + Sync {
    fn save(&self, token: &str) -> Result<()>;
    fn read(&self) -> Result<Option<String>>;
    fn clear(&self) -> Result<()>;
}

/// File-backed store. Writes go through a temp file and rename so a
/// partial write is never observable; the file is owner-only on unix.
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| anyhow!("token store lock poisoned: {e}"))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, token).with_context(|| format!("writing {}", tmp.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("installing {}", self.path.display()))?;
        Ok(())
    }

    fn read(&self) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| anyhow!("token store lock poisoned: {e}"))?;
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim().to_string();
                Ok((!token.is_empty()).then_some(token))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| anyhow!("token store lock poisoned: {e}"))?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|e| anyhow!("token store lock poisoned: {e}"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>> {
        let slot = self
            .token
            .lock()
            .map_err(|e| anyhow!("token store lock poisoned: {e}"))?;
        Ok(slot.clone())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|e| anyhow!("token store lock poisoned: {e}"))?;
        *slot = None;
        Ok(())
    }
}
