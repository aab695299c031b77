// src/safety/mod.rs
// Static screening of proposed Python source before it may be written to disk

use serde::Serialize;
use std::collections::BTreeSet;

pub mod python;

/// Modules giving OS, process, network or HTTP access
pub const DEFAULT_DENIED_MODULES: &[&str] = &[
    "os",
    "subprocess",
    "sys",
    "shutil",
    "requests",
    "urllib",
    "socket",
];

pub const FILE_OPERATION_PATTERNS: &[&str] = &["open(", "write(", "delete(", "remove(", "unlink("];

pub const NETWORK_OPERATION_PATTERNS: &[&str] = &[
    "socket.",
    "connect(",
    "listen(",
    "bind(",
    "request.",
    "urlopen(",
];

/// Checks in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCheck {
    Syntax,
    DeniedImport,
    FileOperation,
    NetworkOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub reason: Option<String>,
    pub failed_check: Option<SafetyCheck>,
}

impl SafetyVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            reason: None,
            failed_check: None,
        }
    }

    pub fn rejected(check: SafetyCheck, reason: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            reason: Some(reason.into()),
            failed_check: Some(check),
        }
    }
}

/// Ordered battery of static checks over proposed source text.
///
/// `check` is a pure function of its input: it reads nothing but the text and
/// the policy, and never touches the filesystem.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    denied_modules: BTreeSet<String>,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            denied_modules: DEFAULT_DENIED_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl SafetyPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the import denylist with additional top-level module names
    pub fn with_denied_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied_modules.extend(
            modules
                .into_iter()
                .map(|m| {
                    let m: String = m.into();
                    m.trim().to_string()
                })
                .filter(|m| !m.is_empty()),
        );
        self
    }

    pub fn denied_modules(&self) -> impl Iterator<Item = &str> {
        self.denied_modules.iter().map(String::as_str)
    }

    /// Return the first failing verdict, or `safe` if every check passes
    pub fn check(&self, source: &str) -> SafetyVerdict {
        let tree = match python::parse(source) {
            Ok(tree) => tree,
            Err(diagnostic) => {
                return SafetyVerdict::rejected(
                    SafetyCheck::Syntax,
                    format!("Invalid syntax: {}", diagnostic),
                );
            }
        };

        for import in python::collect_imports(&tree, source) {
            let top = import.top_level();
            if self.denied_modules.contains(top) {
                let reason = if import.module == top {
                    format!("Dangerous import detected: {}", top)
                } else {
                    format!("Dangerous import detected: {} (via {})", top, import.module)
                };
                return SafetyVerdict::rejected(SafetyCheck::DeniedImport, reason);
            }
        }

        // Raw substring matches: a pattern inside a comment or string still fails.
        if let Some(pattern) = find_pattern(source, FILE_OPERATION_PATTERNS) {
            return SafetyVerdict::rejected(
                SafetyCheck::FileOperation,
                format!("Potentially dangerous file operation detected: {}", pattern),
            );
        }

        if let Some(pattern) = find_pattern(source, NETWORK_OPERATION_PATTERNS) {
            return SafetyVerdict::rejected(
                SafetyCheck::NetworkOperation,
                format!("Potentially dangerous network operation detected: {}", pattern),
            );
        }

        SafetyVerdict::safe()
    }
}

fn find_pattern(source: &str, patterns: &[&'static str]) -> Option<&'static str> {
    patterns.iter().copied().find(|p| source.contains(p))
}
