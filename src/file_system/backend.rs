// src/file_system/backend.rs
// Filesystem seam used by the mutator, with the local-disk implementation

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// The three filesystem primitives a guarded mutation needs
#[async_trait]
pub trait FileBackend: Send + Sync {
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Local disk via tokio::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FileBackend for LocalFs {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        write_file_with_dirs(path, contents).await
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!(".{}.tmp.{}.{}", name, std::process::id(), ts))
}

/// Write file to disk ensuring parent directories exist, using a temp file
/// in the same directory and a rename so the destination is replaced whole.
/// A failed write leaves any existing destination untouched.
pub async fn write_file_with_dirs<P: AsRef<Path>>(
    path: P,
    bytes: impl AsRef<[u8]>,
) -> io::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(path);

    let result = async {
        // Create temp exclusively to avoid races
        let mut file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await?;

        file.write_all(bytes.as_ref()).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = match tokio::fs::metadata(path).await {
                Ok(meta) => meta.permissions().mode(),
                Err(_) => 0o644,
            };
            let _ = tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(mode)).await;
        }

        // On Windows, rename won't overwrite existing files
        #[cfg(windows)]
        {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                tokio::fs::remove_file(path).await?;
            }
        }

        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return result;
    }

    // Fsync parent directory entry to reduce risk of metadata loss on crash
    if let Some(parent) = path.parent() {
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
