//! File-backed [`ClaimStore`].
//!
//! The claim is written as pretty JSON in the format wallets already use
//! (`{"secrets": {"mnemonic": ..., "identityKeyPair": {...}}}`), owner-only
//! on Unix.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use cruxpay_protocol::identity::{ClaimStore, IdentityClaim};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimFileError {
    #[error("claim file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("claim file {path} is not a valid claim: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileClaimStore {
    path: PathBuf,
}

impl FileClaimStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn io_error(&self, source: std::io::Error) -> ClaimFileError {
        ClaimFileError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn json_error(&self, source: serde_json::Error) -> ClaimFileError {
        ClaimFileError::Json {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ClaimStore for FileClaimStore {
    type Error = ClaimFileError;

    fn load(&self) -> Result<Option<IdentityClaim>, Self::Error> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| self.json_error(e))
    }

    fn save(&self, claim: &IdentityClaim) -> Result<(), Self::Error> {
        let raw = serde_json::to_string_pretty(claim).map_err(|e| self.json_error(e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|e| self.io_error(e))?;

        // `mode` only applies on creation; tighten a file that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }
        file.write_all(raw.as_bytes()).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}
