use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{BackendClient, BackendError, Token};
use crate::compare::types::{FileContent, RepoFile, WorkspaceFile};
use crate::compare::ContentFetcher;

/// Everything a comparison reads: both listings plus per-file content.
#[async_trait]
pub trait FileSource: ContentFetcher {
    async fn workspace_files(&self) -> Result<Vec<WorkspaceFile>, BackendError>;

    async fn repository_files(
        &self,
        repo_name: &str,
        branch: &str,
    ) -> Result<Vec<RepoFile>, BackendError>;
}

/// [`FileSource`] backed by the HTTP backend.
pub struct RemoteSource {
    client: BackendClient,
    token: Arc<Token>,
}

impl RemoteSource {
    pub fn new(client: BackendClient, token: Arc<Token>) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl ContentFetcher for RemoteSource {
    async fn fetch(&self, path: &str) -> anyhow::Result<FileContent> {
        self.client.fetch(path).await
    }
}

#[async_trait]
impl FileSource for RemoteSource {
    async fn workspace_files(&self) -> Result<Vec<WorkspaceFile>, BackendError> {
        self.client.workspace_files().await
    }

    async fn repository_files(
        &self,
        repo_name: &str,
        branch: &str,
    ) -> Result<Vec<RepoFile>, BackendError> {
        self.client
            .repository_files(&self.token, repo_name, branch)
            .await
    }
}
