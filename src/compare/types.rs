use serde::{Deserialize, Serialize};

use super::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// A file known to the workspace, as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub name: String,
    pub last_modified: String,
}

/// A file's state in the remote repository at a given branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    pub path: String,
    pub content: String,
    pub sha: String,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// Content returned by a [`ContentFetcher`](super::ContentFetcher).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileContent {
    pub content: String,
    pub last_modified: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Workspace,
    Repository,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    New,
    Modified,
    Deleted,
    Unchanged,
}

impl FileStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::New => "A",
            FileStatus::Modified => "M",
            FileStatus::Deleted => "D",
            FileStatus::Unchanged => " ",
        }
    }

    /// True for statuses that a push would carry to the repository.
    pub fn is_pushable(&self) -> bool {
        matches!(self, FileStatus::New | FileStatus::Modified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRecord {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub source: Source,
    pub category: Category,
    pub status: FileStatus,
    pub last_modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_file: Option<RepoFile>,
}
