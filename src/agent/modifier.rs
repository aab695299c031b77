// src/agent/modifier.rs
// Model-reviewed code modification: analyze the proposal, then apply it through the guarded mutator

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::file_system::{ChangeDiff, FileChangeOutcome, GuardedMutator, MutationError, PathLocks};
use crate::llm::{CodeAnalysis, Finding, GenerationOptions, ModelRouter, RouteError};

#[derive(Debug, thiserror::Error)]
pub enum ModifyError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModificationReport {
    /// The model flagged issues; nothing was written
    Rejected {
        issues: Vec<Finding>,
        analysis: CodeAnalysis,
    },
    /// The mutator refused or failed the write
    Failed {
        analysis: CodeAnalysis,
        outcome: FileChangeOutcome,
    },
    Applied {
        analysis: CodeAnalysis,
        outcome: FileChangeOutcome,
        diff: String,
    },
}

impl ModificationReport {
    pub fn is_applied(&self) -> bool {
        matches!(self, ModificationReport::Applied { .. })
    }
}

pub struct CodeModifier {
    router: Arc<ModelRouter>,
    mutator: GuardedMutator,
    locks: PathLocks,
    analysis_model: String,
}

impl CodeModifier {
    pub fn new(router: Arc<ModelRouter>, mutator: GuardedMutator, analysis_model: impl Into<String>) -> Self {
        Self {
            router,
            mutator,
            locks: PathLocks::new(),
            analysis_model: analysis_model.into(),
        }
    }

    pub fn mutator(&self) -> &GuardedMutator {
        &self.mutator
    }

    /// Ask the analysis model to review `proposed` against the file's current text
    pub async fn analyze_changes(&self, path: &Path, proposed: &str) -> Result<CodeAnalysis, ModifyError> {
        let current = read_current(path).await?;
        self.review(path, current.as_deref(), proposed).await
    }

    /// Review, then write. The path stays locked from the read through the write,
    /// so the reported diff is against the text that was actually replaced.
    pub async fn execute_modification(
        &self,
        path: &Path,
        proposed: &str,
    ) -> Result<ModificationReport, ModifyError> {
        let _guard = self.locks.lock(path).await;

        let current = read_current(path).await?;
        let analysis = self.review(path, current.as_deref(), proposed).await?;

        let issues = analysis.critical_issues();
        if !issues.is_empty() {
            warn!(
                "Modification of {} rejected: {} critical issue(s)",
                path.display(),
                issues.len()
            );
            return Ok(ModificationReport::Rejected { issues, analysis });
        }

        let outcome = self.mutator.apply(path, proposed, true).await?;
        if !outcome.success {
            return Ok(ModificationReport::Failed { analysis, outcome });
        }

        let diff = ChangeDiff::new(path.display().to_string(), current, proposed);
        let (added, removed) = diff.stats();
        info!("Modified {} (+{} -{})", path.display(), added, removed);

        Ok(ModificationReport::Applied {
            analysis,
            outcome,
            diff: diff.unified_diff(),
        })
    }

    /// Guarded write without model review, serialized per path
    pub async fn apply_unreviewed(
        &self,
        path: &Path,
        new_text: &str,
        make_backup: bool,
    ) -> Result<FileChangeOutcome, MutationError> {
        let _guard = self.locks.lock(path).await;
        self.mutator.apply(path, new_text, make_backup).await
    }

    async fn review(
        &self,
        path: &Path,
        current: Option<&str>,
        proposed: &str,
    ) -> Result<CodeAnalysis, ModifyError> {
        let code = review_document(path, current, proposed);
        Ok(self
            .router
            .analyze_code(&self.analysis_model, code, GenerationOptions::default())
            .await?)
    }
}

fn review_document(path: &Path, current: Option<&str>, proposed: &str) -> String {
    let current = current.unwrap_or("(file does not exist yet)");
    format!(
        "File: {}\n\nCurrent code:\n{}\n\nProposed changes:\n{}",
        path.display(),
        current,
        proposed
    )
}

/// `None` when the file does not exist
async fn read_current(path: &Path) -> Result<Option<String>, ModifyError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ModifyError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
