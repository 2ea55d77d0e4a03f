use serde::{Deserialize, Serialize};

use crate::compare::types::{RepoFile, WorkspaceFile};

// Requests. Bodies carrying the token are built just before sending and
// dropped right after.

#[derive(Serialize)]
pub(super) struct TokenRequest<'a> {
    pub token: &'a str,
}

#[derive(Serialize)]
pub(super) struct RepoFilesRequest<'a> {
    pub token: &'a str,
    pub repo_name: &'a str,
    pub branch: &'a str,
}

#[derive(Serialize)]
pub(super) struct PushRequest<'a> {
    pub token: &'a str,
    pub repo_name: &'a str,
    pub files: &'a [String],
    pub commit_message: &'a str,
    pub branch: &'a str,
}

#[derive(Serialize)]
pub(super) struct ListBranchesRequest<'a> {
    pub token: &'a str,
    pub repo_name: &'a str,
}

#[derive(Serialize)]
pub(super) struct CreateBranchRequest<'a> {
    pub token: &'a str,
    pub repo_name: &'a str,
    pub branch_name: &'a str,
    pub from_branch: &'a str,
}

#[derive(Serialize)]
pub(super) struct BranchProtectionRequest<'a> {
    pub token: &'a str,
    pub repo_name: &'a str,
    pub branch_name: &'a str,
}

#[derive(Serialize)]
pub(super) struct ReadFileRequest<'a> {
    pub path: &'a str,
}

#[derive(Serialize)]
pub(super) struct DiffRequest<'a> {
    pub workspace_content: &'a str,
    pub repo_content: &'a str,
    pub filename: &'a str,
}

// Responses

#[derive(Debug, Deserialize)]
pub(super) struct AuthResponse {
    pub success: bool,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RepositoriesResponse {
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SavedTokenResponse {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SaveTokenResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct RepoFilesResponse {
    pub files: Vec<RepoFile>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WorkspaceFilesResponse {
    pub files: Vec<WorkspaceFile>,
}

/// Outcome of a push or branch creation. The backend reports most GitHub
/// failures in-band with `success: false`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub protected: bool,
    pub default: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListBranchesResponse {
    pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchProtection {
    pub protected: bool,
    pub required_reviews: u32,
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    pub required_status_checks: Vec<String>,
}

/// Pre-rendered diff markup from the backend. Opaque to this crate.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedDiff {
    pub diff_html: String,
    pub styles: String,
}
