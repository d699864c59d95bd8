use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DesiredFiles
// ---------------------------------------------------------------------------

/// Desired repository content: repository-relative path to full text, in the
/// order the caller wants them written. Inserting an existing path replaces
/// its content in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredFiles {
    entries: Vec<(String, String)>,
}

impl DesiredFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let content = content.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = content,
            None => self.entries.push((path, content)),
        }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for DesiredFiles {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut files = DesiredFiles::new();
        for (path, content) in iter {
            files.insert(path, content);
        }
        files
    }
}

// ---------------------------------------------------------------------------
// SyncMode
// ---------------------------------------------------------------------------

/// Whether a synchronization call builds a new repository or revises one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Create,
    Update,
}

impl SyncMode {
    /// Round 1 creates; every later round updates.
    pub fn from_round(round: u32) -> Self {
        if round <= 1 {
            SyncMode::Create
        } else {
            SyncMode::Update
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Create => "create",
            SyncMode::Update => "update",
        }
    }
}

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// Latest commit on the published repository. `Unknown` means the revision
/// could not be confirmed; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Known(String),
    Unknown,
}

impl Revision {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn as_str(&self) -> &str {
        match self {
            Revision::Known(sha) => sha,
            Revision::Unknown => Self::UNKNOWN,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Revision::Known(_))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Revision {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(if s.is_empty() || s == Self::UNKNOWN {
            Revision::Unknown
        } else {
            Revision::Known(s)
        })
    }
}

// ---------------------------------------------------------------------------
// File reports and warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "reason", rename_all = "snake_case")]
pub enum FileAction {
    Created,
    Updated,
    /// Update was rejected; the file was deleted and created again.
    Recreated,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    #[serde(flatten)]
    pub action: FileAction,
}

/// A failure that was absorbed instead of aborting the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncWarning {
    NonCriticalFile { path: String, reason: String },
    Scaffold { path: String, reason: String },
    Hosting { action: String, reason: String },
    Revision { reason: String },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::NonCriticalFile { path, reason } => write!(f, "{path}: {reason}"),
            SyncWarning::Scaffold { path, reason } => write!(f, "scaffold {path}: {reason}"),
            SyncWarning::Hosting { action, reason } => write!(f, "hosting {action}: {reason}"),
            SyncWarning::Revision { reason } => write!(f, "revision: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// PublicationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationResult {
    pub repo_name: String,
    pub repo_url: String,
    pub revision: Revision,
    pub pages_url: String,
    pub mode: SyncMode,
    #[serde(default)]
    pub files: Vec<FileReport>,
    #[serde(default)]
    pub warnings: Vec<SyncWarning>,
}

impl PublicationResult {
    pub fn action_for(&self, path: &str) -> Option<&FileAction> {
        self.files.iter().find(|f| f.path == path).map(|f| &f.action)
    }
}

/// Public static-hosting URL for a repository.
pub fn pages_url(owner: &str, repo_name: &str) -> String {
    format!("https://{owner}.github.io/{repo_name}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desired_files_keep_insertion_order() {
        let mut files: DesiredFiles = [("index.html", "a"), ("README.md", "b")]
            .into_iter()
            .collect();
        files.insert("index.html", "c");
        let order: Vec<&str> = files.paths().collect();
        assert_eq!(order, vec!["index.html", "README.md"]);
        assert_eq!(files.get("index.html"), Some("c"));
        assert_eq!(files.len(), 2);
        assert!(!files.contains("LICENSE"));
    }

    #[test]
    fn round_selects_mode() {
        assert_eq!(SyncMode::from_round(1), SyncMode::Create);
        assert_eq!(SyncMode::from_round(2), SyncMode::Update);
        assert_eq!(SyncMode::from_round(7), SyncMode::Update);
    }

    #[test]
    fn unknown_revision_serializes_as_sentinel() {
        let json = serde_json::to_string(&Revision::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
        let back: Revision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Revision::Unknown);
        let known: Revision = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(known, Revision::Known("abc123".into()));
    }

    #[test]
    fn file_report_flattens_action() {
        let report = FileReport {
            path: "index.html".into(),
            action: FileAction::Failed("conflict".into()),
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["path"], "index.html");
        assert_eq!(v["action"], "failed");
        assert_eq!(v["reason"], "conflict");
    }

    #[test]
    fn pages_url_format() {
        assert_eq!(
            pages_url("alice", "quiz-app-20250101000000"),
            "https://alice.github.io/quiz-app-20250101000000/"
        );
    }
}
