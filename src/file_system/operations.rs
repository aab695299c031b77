// src/file_system/operations.rs
// Apply a screened replacement text to a file with backup-then-write-then-restore

use serde::Serialize;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::backend::{FileBackend, LocalFs};
use crate::safety::SafetyPolicy;

/// Terminal state of one mutation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    RejectedUnsafe,
    Success,
    FailedAndRestored,
    FailedWriteNoBackup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChangeOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub backup_path: Option<PathBuf>,
    pub state: MutationState,
}

impl FileChangeOutcome {
    fn rejected(reason: String) -> Self {
        Self {
            success: false,
            error: Some(reason),
            backup_path: None,
            state: MutationState::RejectedUnsafe,
        }
    }

    fn written(backup_path: Option<PathBuf>) -> Self {
        Self {
            success: true,
            error: None,
            backup_path,
            state: MutationState::Success,
        }
    }

    fn failed(error: String, state: MutationState) -> Self {
        Self {
            success: false,
            error: Some(error),
            backup_path: None,
            state,
        }
    }
}

/// Filesystem faults that could not be turned into an ordinary outcome
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// Moving the original aside failed; the target was not modified
    #[error("failed to back up {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The write failed and so did moving the backup back. The target may be
    /// missing or partial; the original content is only at `backup`.
    #[error(
        "write to {} failed ({write_error}) and restore from {} also failed ({restore_error}); manual recovery required",
        .path.display(),
        .backup.display()
    )]
    RestoreFailed {
        path: PathBuf,
        backup: PathBuf,
        write_error: io::Error,
        restore_error: io::Error,
    },
}

/// Sibling backup location: `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(".bak");
    PathBuf::from(os)
}

/// Screens, backs up, writes and restores.
///
/// Not atomic across steps and holds no lock: callers must serialize
/// attempts on the same path (see `PathLocks`).
pub struct GuardedMutator {
    policy: SafetyPolicy,
    backend: Arc<dyn FileBackend>,
}

impl GuardedMutator {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self {
            policy,
            backend: Arc::new(LocalFs),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn FileBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    pub async fn apply(
        &self,
        path: &Path,
        new_text: &str,
        make_backup: bool,
    ) -> Result<FileChangeOutcome, MutationError> {
        let verdict = self.policy.check(new_text);
        if !verdict.is_safe {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "rejected by safety policy".to_string());
            warn!("Rejected change to {}: {}", path.display(), reason);
            return Ok(FileChangeOutcome::rejected(format!(
                "Safety check failed: {}",
                reason
            )));
        }

        let backup = if make_backup {
            self.back_up(path).await?
        } else {
            None
        };

        let write_error = match self.backend.write(path, new_text.as_bytes()).await {
            Ok(()) => {
                info!("Wrote {} bytes to {}", new_text.len(), path.display());
                return Ok(FileChangeOutcome::written(backup));
            }
            Err(e) => e,
        };

        let Some(backup) = backup else {
            warn!("Write to {} failed with no backup: {}", path.display(), write_error);
            return Ok(FileChangeOutcome::failed(
                write_error.to_string(),
                MutationState::FailedWriteNoBackup,
            ));
        };

        match self.backend.rename(&backup, path).await {
            Ok(()) => {
                warn!(
                    "Write to {} failed, original restored from backup: {}",
                    path.display(),
                    write_error
                );
                Ok(FileChangeOutcome::failed(
                    write_error.to_string(),
                    MutationState::FailedAndRestored,
                ))
            }
            Err(restore_error) => {
                error!(
                    "Write to {} failed ({}) and restore from {} failed ({}); original content only at backup",
                    path.display(),
                    write_error,
                    backup.display(),
                    restore_error
                );
                Err(MutationError::RestoreFailed {
                    path: path.to_path_buf(),
                    backup,
                    write_error,
                    restore_error,
                })
            }
        }
    }

    /// Move an existing target to `<path>.bak`; nothing to do when it is absent
    async fn back_up(&self, path: &Path) -> Result<Option<PathBuf>, MutationError> {
        let backup_err = |source: io::Error| MutationError::Backup {
            path: path.to_path_buf(),
            source,
        };

        if !self.backend.exists(path).await.map_err(backup_err)? {
            debug!("No existing file at {}, writing without backup", path.display());
            return Ok(None);
        }

        let backup = backup_path(path);
        self.backend.rename(path, &backup).await.map_err(backup_err)?;
        info!("Backed up {} to {}", path.display(), backup.display());
        Ok(Some(backup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/srv/app/agent.py")),
            PathBuf::from("/srv/app/agent.py.bak")
        );
        assert_eq!(backup_path(Path::new("Makefile")), PathBuf::from("Makefile.bak"));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = FileChangeOutcome::written(Some(PathBuf::from("a.py.bak")));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["state"], "success");
        assert_eq!(json["backup_path"], "a.py.bak");
    }

    #[test]
    fn test_restore_failed_display() {
        let err = MutationError::RestoreFailed {
            path: PathBuf::from("a.py"),
            backup: PathBuf::from("a.py.bak"),
            write_error: io::Error::other("disk full"),
            restore_error: io::Error::other("permission denied"),
        };
        let text = err.to_string();
        assert!(text.contains("disk full"));
        assert!(text.contains("a.py.bak"));
        assert!(text.contains("manual recovery required"));
    }
}
