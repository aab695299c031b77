// src/file_system/locks.rs
// Per-path mutual exclusion for anything exposing GuardedMutator::apply

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async gate per file path. Hold the guard for the whole of one `apply`.
#[derive(Debug, Default)]
pub struct PathLocks {
    gates: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        let gate = {
            let mut gates = self.gates.lock().await;
            // Drop gates nobody holds or waits on
            gates.retain(|_, gate| Arc::strong_count(gate) > 1);
            gates.entry(key).or_default().clone()
        };

        gate.lock_owned().await
    }

    /// Number of paths with a held or awaited gate
    #[cfg(test)]
    async fn in_use(&self) -> usize {
        self.gates
            .lock()
            .await
            .values()
            .filter(|gate| Arc::strong_count(gate) > 1)
            .count()
    }
}
