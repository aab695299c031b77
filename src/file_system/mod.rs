// src/file_system/mod.rs
// Guarded file mutation: safety screening, backup, write, restore on failure

pub mod backend;
pub mod diff;
pub mod locks;
pub mod operations;

pub use diff::ChangeDiff;
pub use backend::{FileBackend, LocalFs, write_file_with_dirs};
pub use locks::PathLocks;
pub use operations::{FileChangeOutcome, GuardedMutator, MutationError, MutationState, backup_path};
