use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretBox};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::BackendError;
use super::types::*;
use crate::compare::types::{FileContent, RepoFile, WorkspaceFile};
use crate::compare::ContentFetcher;

pub type Token = SecretBox<String>;

const AUTH: &str = "/github/api/auth";
const REPOSITORIES: &str = "/github/api/repositories";
const SAVED_TOKEN: &str = "/github/api/saved-token";
const SAVE_TOKEN: &str = "/github/api/save-token";
const REPO_FILES: &str = "/github/api/repo-files";
const PUSH: &str = "/github/api/push";
const LIST_BRANCHES: &str = "/github/branch/api/list-branches";
const CREATE_BRANCH: &str = "/github/branch/api/create-branch";
const BRANCH_PROTECTION: &str = "/github/branch/api/branch-protection";
const WORKSPACE_FILES: &str = "/workspace/api/list-files";
const READ_FILE: &str = "/workspace/api/read-file";
const RENDER_DIFF: &str = "/diff/api/diff";

/// Thin request/response wrapper over the backend's REST endpoints.
///
/// Holds no credentials; token-bearing calls take the token explicitly and
/// expose it only while serializing the request body.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ghsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, BackendError> {
        tracing::debug!(path, "GET");
        let response = self.http.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, BackendError> {
        tracing::debug!(path, "POST");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }

    /// Verify a token and return the GitHub username it belongs to.
    pub async fn authenticate(&self, token: &Token) -> Result<String, BackendError> {
        let body = TokenRequest {
            token: token.expose_secret(),
        };
        let response: AuthResponse = self.post(AUTH, &body).await?;
        if !response.success {
            return Err(BackendError::Unauthorized("authentication failed".to_string()));
        }
        Ok(response.username)
    }

    pub async fn list_repositories(&self, token: &Token) -> Result<Vec<Repository>, BackendError> {
        let body = TokenRequest {
            token: token.expose_secret(),
        };
        let response: RepositoriesResponse = self.post(REPOSITORIES, &body).await?;
        Ok(response.repositories)
    }

    /// The token kept in the backend's secret store, if any.
    pub async fn saved_token(&self) -> Result<Option<Token>, BackendError> {
        let response: SavedTokenResponse = self.get(SAVED_TOKEN).await?;
        Ok(response
            .token
            .filter(|t| !t.is_empty())
            .map(|t| SecretBox::new(Box::new(t))))
    }

    pub async fn save_token(&self, token: &Token) -> Result<(), BackendError> {
        let body = TokenRequest {
            token: token.expose_secret(),
        };
        let response: SaveTokenResponse = self.post(SAVE_TOKEN, &body).await?;
        if !response.success {
            return Err(BackendError::Rejected("backend refused to store the token".to_string()));
        }
        Ok(())
    }

    /// Files of `repo_name` at `branch`. An empty repository yields no files.
    pub async fn repository_files(
        &self,
        token: &Token,
        repo_name: &str,
        branch: &str,
    ) -> Result<Vec<RepoFile>, BackendError> {
        let body = RepoFilesRequest {
            token: token.expose_secret(),
            repo_name,
            branch,
        };
        match self.post::<_, RepoFilesResponse>(REPO_FILES, &body).await {
            Ok(response) => Ok(response.files),
            Err(e) if e.is_empty_repository() => {
                tracing::info!(repo_name, branch, "repository is empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn push(
        &self,
        token: &Token,
        repo_name: &str,
        branch: &str,
        files: &[String],
        commit_message: &str,
    ) -> Result<OperationOutcome, BackendError> {
        let body = PushRequest {
            token: token.expose_secret(),
            repo_name,
            files,
            commit_message,
            branch,
        };
        self.post(PUSH, &body).await
    }

    pub async fn list_branches(
        &self,
        token: &Token,
        repo_name: &str,
    ) -> Result<Vec<Branch>, BackendError> {
        let body = ListBranchesRequest {
            token: token.expose_secret(),
            repo_name,
        };
        let response: ListBranchesResponse = self.post(LIST_BRANCHES, &body).await?;
        Ok(response.branches)
    }

    pub async fn create_branch(
        &self,
        token: &Token,
        repo_name: &str,
        branch_name: &str,
        from_branch: &str,
    ) -> Result<OperationOutcome, BackendError> {
        let body = CreateBranchRequest {
            token: token.expose_secret(),
            repo_name,
            branch_name,
            from_branch,
        };
        self.post(CREATE_BRANCH, &body).await
    }

    pub async fn branch_protection(
        &self,
        token: &Token,
        repo_name: &str,
        branch_name: &str,
    ) -> Result<BranchProtection, BackendError> {
        let body = BranchProtectionRequest {
            token: token.expose_secret(),
            repo_name,
            branch_name,
        };
        self.post(BRANCH_PROTECTION, &body).await
    }

    pub async fn workspace_files(&self) -> Result<Vec<WorkspaceFile>, BackendError> {
        let response: WorkspaceFilesResponse = self.get(WORKSPACE_FILES).await?;
        Ok(response.files)
    }

    pub async fn read_file(&self, path: &str) -> Result<FileContent, BackendError> {
        self.post(READ_FILE, &ReadFileRequest { path })
            .await
            .map_err(|e| match e {
                BackendError::Status { status, .. } => BackendError::Status {
                    status,
                    detail: "Failed to read file".to_string(),
                },
                other => other,
            })
    }

    pub async fn render_diff(
        &self,
        workspace_content: &str,
        repo_content: &str,
        filename: &str,
    ) -> Result<RenderedDiff, BackendError> {
        let body = DiffRequest {
            workspace_content,
            repo_content,
            filename,
        };
        self.post(RENDER_DIFF, &body).await
    }
}

#[async_trait]
impl ContentFetcher for BackendClient {
    async fn fetch(&self, path: &str) -> anyhow::Result<FileContent> {
        Ok(self.read_file(path).await?)
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::from_response(status.as_u16(), &body));
    }
    response
        .json::<R>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}
