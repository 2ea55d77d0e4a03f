use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::compare::types::ComparisonRecord;
use crate::compare::{CompareError, Comparator};

use super::channel::{CompareRequest, CompareResult};
use super::FileSource;

/// Runs comparisons off the caller's task. A new request aborts the one
/// still in flight. Results carry their generation so the caller can still
/// discard any that finished before the abort landed.
pub struct CompareWorker {
    request_tx: mpsc::UnboundedSender<CompareRequest>,
    result_rx: mpsc::UnboundedReceiver<CompareResult>,
}

impl CompareWorker {
    pub fn new<S>(source: Arc<S>, comparator: Arc<Comparator>) -> Self
    where
        S: FileSource + 'static,
    {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<CompareRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<CompareResult>();

        tokio::spawn(async move {
            let mut in_flight: Option<(u64, AbortHandle)> = None;
            while let Some(request) = request_rx.recv().await {
                if let Some((generation, handle)) = in_flight.take() {
                    if !handle.is_finished() {
                        tracing::debug!(generation, "aborting superseded comparison");
                        handle.abort();
                    }
                }

                let source = Arc::clone(&source);
                let comparator = Arc::clone(&comparator);
                let tx = result_tx.clone();
                let generation = request.generation;

                let task = tokio::spawn(async move {
                    let records = run_comparison(source.as_ref(), &comparator, &request).await;
                    if let Err(ref e) = records {
                        tracing::warn!(generation = request.generation, error = %e, "comparison failed");
                    }
                    let _ = tx.send(CompareResult {
                        generation: request.generation,
                        records,
                    });
                });
                in_flight = Some((generation, task.abort_handle()));
            }
        });

        Self {
            request_tx,
            result_rx,
        }
    }

    pub fn request(&self, req: CompareRequest) {
        tracing::debug!(generation = req.generation, repo = %req.repo_name, branch = %req.branch, "comparison requested");
        let _ = self.request_tx.send(req);
    }

    pub async fn recv(&mut self) -> Option<CompareResult> {
        self.result_rx.recv().await
    }
}

/// List both sides, then classify. Listing failures are fatal for the run
/// since there is no safe default for a whole file set.
pub async fn run_comparison<S>(
    source: &S,
    comparator: &Comparator,
    request: &CompareRequest,
) -> Result<Vec<ComparisonRecord>, CompareError>
where
    S: FileSource + ?Sized,
{
    let (workspace, repository) = tokio::join!(
        source.workspace_files(),
        source.repository_files(&request.repo_name, &request.branch)
    );
    let workspace = workspace.map_err(CompareError::WorkspaceListing)?;
    let repository = repository.map_err(CompareError::RepositoryListing)?;
    comparator.compare(&workspace, &repository, source).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::compare::types::{FileContent, FileKind, FileStatus, RepoFile, WorkspaceFile};
    use crate::compare::ContentFetcher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// One workspace file `/app/src/a.ts` with content "a". The repository
    /// side depends on the branch: `slow` sleeps and matches, anything else
    /// answers immediately with different content.
    pub(crate) struct BranchSource {
        pub fail_workspace: bool,
    }

    #[async_trait]
    impl ContentFetcher for BranchSource {
        async fn fetch(&self, _path: &str) -> anyhow::Result<FileContent> {
            Ok(FileContent {
                content: "a".to_string(),
                last_modified: "2024-05-01T12:00:00".to_string(),
            })
        }
    }

    #[async_trait]
    impl FileSource for BranchSource {
        async fn workspace_files(&self) -> Result<Vec<WorkspaceFile>, BackendError> {
            if self.fail_workspace {
                return Err(BackendError::Network("connection reset".to_string()));
            }
            Ok(vec![WorkspaceFile {
                path: "/app/src/a.ts".to_string(),
                kind: FileKind::File,
                name: "a.ts".to_string(),
                last_modified: "2024-05-01T12:00:00".to_string(),
            }])
        }

        async fn repository_files(
            &self,
            _repo_name: &str,
            branch: &str,
        ) -> Result<Vec<RepoFile>, BackendError> {
            let content = if branch == "slow" {
                tokio::time::sleep(Duration::from_millis(80)).await;
                "a"
            } else {
                "b"
            };
            Ok(vec![RepoFile {
                path: "src/a.ts".to_string(),
                content: content.to_string(),
                sha: branch.to_string(),
                last_modified: None,
            }])
        }
    }

    pub(crate) fn request(generation: u64, branch: &str) -> CompareRequest {
        CompareRequest {
            generation,
            repo_name: "me/repo".to_string(),
            branch: branch.to_string(),
        }
    }

    #[tokio::test]
    async fn test_superseded_request_yields_no_result() {
        let source = Arc::new(BranchSource {
            fail_workspace: false,
        });
        let mut worker = CompareWorker::new(source, Arc::new(Comparator::default()));

        worker.request(request(1, "slow"));
        worker.request(request(2, "fast"));

        let latest = worker.recv().await.unwrap();
        assert_eq!(latest.generation, 2);
        assert_eq!(latest.records.unwrap()[0].status, FileStatus::Modified);

        let late = tokio::time::timeout(Duration::from_millis(200), worker.recv()).await;
        assert!(late.is_err(), "aborted comparison still delivered a result");
    }

    /// Workspace listing that takes 200ms and tracks how many listings are
    /// running at once and how many ran to completion.
    #[derive(Default)]
    struct CountingSource {
        active: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
    }

    struct ActiveGuard<'a>(&'a AtomicUsize);

    impl Drop for ActiveGuard<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ContentFetcher for CountingSource {
        async fn fetch(&self, _path: &str) -> anyhow::Result<FileContent> {
            anyhow::bail!("no content")
        }
    }

    #[async_trait]
    impl FileSource for CountingSource {
        async fn workspace_files(&self) -> Result<Vec<WorkspaceFile>, BackendError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = ActiveGuard(&self.active);
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn repository_files(
            &self,
            _repo_name: &str,
            _branch: &str,
        ) -> Result<Vec<RepoFile>, BackendError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_back_to_back_requests_run_one_comparison() {
        let source = Arc::new(CountingSource::default());
        let mut worker = CompareWorker::new(Arc::clone(&source), Arc::new(Comparator::default()));

        for generation in 1..=10 {
            worker.request(request(generation, "main"));
        }

        let result = worker.recv().await.unwrap();
        assert_eq!(result.generation, 10);
        assert!(result.records.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
        assert_eq!(source.completed.load(Ordering::SeqCst), 1);
        assert_eq!(source.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_workspace_listing_failure_is_classified() {
        let source = BranchSource {
            fail_workspace: true,
        };
        let err = run_comparison(&source, &Comparator::default(), &request(1, "fast"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::WorkspaceListing(_)));
        assert_eq!(err.to_string(), "failed to fetch workspace files");
    }
}
