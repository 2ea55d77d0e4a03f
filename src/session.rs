use std::sync::Arc;

use secrecy::SecretBox;

use crate::backend::{
    sanitize_branch_name, BackendClient, BackendError, Branch, BranchProtection,
    OperationOutcome, Repository, Token,
};

/// What to do with a token whose verification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRecovery {
    /// The backend could not be reached; the token may still be valid.
    Keep,
    /// The token was rejected.
    Clear,
}

impl TokenRecovery {
    pub fn for_error(err: &BackendError) -> Self {
        if err.is_transient() {
            TokenRecovery::Keep
        } else {
            TokenRecovery::Clear
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    NoToken,
    Authenticated(String),
    /// Token kept but not verified because the backend was unreachable.
    Unverified,
    /// Saved token was rejected and dropped from the session.
    Cleared,
}

/// Authenticated connection to the backend: the client plus the credential
/// every GitHub call needs.
pub struct Session {
    client: BackendClient,
    token: Option<Arc<Token>>,
    username: Option<String>,
}

impl Session {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            token: None,
            username: None,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Result<Arc<Token>, BackendError> {
        self.token.clone().ok_or(BackendError::NotAuthenticated)
    }

    /// Pick up the token from the backend's secret store and verify it.
    pub async fn load_saved_token(&mut self) -> Result<LoadOutcome, BackendError> {
        let Some(token) = self.client.saved_token().await? else {
            return Ok(LoadOutcome::NoToken);
        };
        Ok(self.adopt_unsaved(token).await)
    }

    /// Use a token for this process only (e.g. from `GHSYNC_TOKEN`).
    pub async fn login(&mut self, token: String) -> LoadOutcome {
        self.adopt_unsaved(SecretBox::new(Box::new(token))).await
    }

    async fn adopt_unsaved(&mut self, token: Token) -> LoadOutcome {
        match self.client.authenticate(&token).await {
            Ok(username) => {
                tracing::info!(%username, "authenticated");
                self.token = Some(Arc::new(token));
                self.username = Some(username.clone());
                LoadOutcome::Authenticated(username)
            }
            Err(e) => match TokenRecovery::for_error(&e) {
                TokenRecovery::Keep => {
                    tracing::warn!(error = %e, "could not verify token, keeping it");
                    self.token = Some(Arc::new(token));
                    self.username = None;
                    LoadOutcome::Unverified
                }
                TokenRecovery::Clear => {
                    tracing::warn!(error = %e, "token rejected");
                    self.token = None;
                    self.username = None;
                    LoadOutcome::Cleared
                }
            },
        }
    }

    /// Verify and persist a new token. On any failure the previously held
    /// token stays in place.
    pub async fn save_token(&mut self, token: String) -> Result<String, BackendError> {
        let token: Token = SecretBox::new(Box::new(token));
        let username = self.client.authenticate(&token).await?;
        self.client.save_token(&token).await?;
        tracing::info!(%username, "token saved");
        self.token = Some(Arc::new(token));
        self.username = Some(username.clone());
        Ok(username)
    }

    pub async fn list_repositories(&self) -> Result<Vec<Repository>, BackendError> {
        let token = self.token()?;
        self.client.list_repositories(&token).await
    }

    pub async fn list_branches(&self, repo_name: &str) -> Result<Vec<Branch>, BackendError> {
        let token = self.token()?;
        self.client.list_branches(&token, repo_name).await
    }

    /// Create `branch_name` (sanitized) from `from_branch`. Returns the name
    /// actually created.
    pub async fn create_branch(
        &self,
        repo_name: &str,
        branch_name: &str,
        from_branch: &str,
    ) -> Result<String, BackendError> {
        let Some(sanitized) = sanitize_branch_name(branch_name) else {
            return Err(BackendError::Rejected(
                "invalid branch name: use only letters, numbers, hyphens and underscores"
                    .to_string(),
            ));
        };
        let token = self.token()?;
        let outcome = self
            .client
            .create_branch(&token, repo_name, &sanitized, from_branch)
            .await?;
        into_result(outcome)?;
        Ok(sanitized)
    }

    pub async fn branch_protection(
        &self,
        repo_name: &str,
        branch_name: &str,
    ) -> Result<BranchProtection, BackendError> {
        let token = self.token()?;
        self.client
            .branch_protection(&token, repo_name, branch_name)
            .await
    }

    pub async fn push(
        &self,
        repo_name: &str,
        branch: &str,
        files: &[String],
        commit_message: &str,
    ) -> Result<String, BackendError> {
        if files.is_empty() {
            return Err(BackendError::Rejected("no files selected".to_string()));
        }
        if commit_message.trim().is_empty() {
            return Err(BackendError::Rejected("commit message is empty".to_string()));
        }
        let token = self.token()?;
        tracing::info!(repo_name, branch, files = files.len(), "pushing");
        let outcome = self
            .client
            .push(&token, repo_name, branch, files, commit_message)
            .await?;
        into_result(outcome)
    }
}

fn into_result(outcome: OperationOutcome) -> Result<String, BackendError> {
    if outcome.success {
        Ok(outcome.message)
    } else {
        Err(BackendError::Rejected(outcome.message))
    }
}
