// src/file_system/diff.rs
// Unified diff of a file change for reports and logs

use serde::Serialize;

const NEW_FILE_PREVIEW_LINES: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct ChangeDiff {
    pub path: String,
    pub old_content: Option<String>,
    pub new_content: String,
}

impl ChangeDiff {
    pub fn new(path: impl Into<String>, old_content: Option<String>, new_content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            old_content,
            new_content: new_content.into(),
        }
    }

    pub fn is_new_file(&self) -> bool {
        self.old_content.is_none()
    }

    pub fn has_changes(&self) -> bool {
        self.old_content.as_deref() != Some(self.new_content.as_str())
    }

    /// Unified diff with three lines of context
    pub fn unified_diff(&self) -> String {
        let Some(old) = self.old_content.as_deref() else {
            return self.format_new_file();
        };

        let diff = similar::TextDiff::from_lines(old, self.new_content.as_str());

        let mut output = String::new();
        output.push_str(&format!("--- a/{}\n", self.path));
        output.push_str(&format!("+++ b/{}\n", self.path));
        for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
            output.push_str(&hunk.to_string());
        }
        output
    }

    fn format_new_file(&self) -> String {
        let mut output = String::new();
        output.push_str("--- /dev/null\n");
        output.push_str(&format!("+++ b/{}\n", self.path));

        let total_lines = self.new_content.lines().count();
        output.push_str(&format!("@@ -0,0 +1,{} @@\n", total_lines));
        for line in self.new_content.lines().take(NEW_FILE_PREVIEW_LINES) {
            output.push_str(&format!("+{}\n", line));
        }
        if total_lines > NEW_FILE_PREVIEW_LINES {
            output.push_str(&format!(
                "... ({} more lines)\n",
                total_lines - NEW_FILE_PREVIEW_LINES
            ));
        }
        output
    }

    /// (added, removed) line counts
    pub fn stats(&self) -> (usize, usize) {
        let old = self.old_content.as_deref().unwrap_or("");
        let diff = similar::TextDiff::from_lines(old, self.new_content.as_str());

        let mut added = 0;
        let mut removed = 0;
        for change in diff.iter_all_changes() {
            match change.tag() {
                similar::ChangeTag::Insert => added += 1,
                similar::ChangeTag::Delete => removed += 1,
                similar::ChangeTag::Equal => {}
            }
        }
        (added, removed)
    }
}
