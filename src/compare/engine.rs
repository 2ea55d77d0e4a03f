use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::Category;
use super::error::CompareError;
use super::normalize::{normalize_content, PathNormalizer};
use super::now_timestamp;
use super::types::*;

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Source of workspace file contents. The backend client implements this;
/// tests substitute in-memory fakes.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> anyhow::Result<FileContent>;
}

pub struct Comparator {
    paths: PathNormalizer,
    concurrency: usize,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(PathNormalizer::default(), DEFAULT_CONCURRENCY)
    }
}

impl Comparator {
    pub fn new(paths: PathNormalizer, concurrency: usize) -> Self {
        Self {
            paths,
            concurrency: concurrency.max(1),
        }
    }

    pub fn paths(&self) -> &PathNormalizer {
        &self.paths
    }

    /// Classify every workspace file against the repository, then append a
    /// `deleted` record for each repository file missing from the workspace.
    ///
    /// Workspace records keep workspace enumeration order even though content
    /// fetches run concurrently. A failed fetch degrades that one file to empty
    /// content instead of failing the comparison.
    pub async fn compare<F>(
        &self,
        workspace: &[WorkspaceFile],
        repository: &[RepoFile],
        fetcher: &F,
    ) -> Result<Vec<ComparisonRecord>, CompareError>
    where
        F: ContentFetcher + ?Sized,
    {
        validate(workspace, repository)?;

        // collect() overwrites on duplicate keys, so the last entry wins
        let repo_by_path: HashMap<String, &RepoFile> = repository
            .iter()
            .map(|f| (self.paths.normalize(&f.path), f))
            .collect();
        let workspace_by_path: HashMap<String, &WorkspaceFile> = workspace
            .iter()
            .map(|f| (self.paths.normalize(&f.path), f))
            .collect();

        let fetches: Vec<_> = workspace
            .iter()
            .map(|file| fetch_or_empty(fetcher, &file.path))
            .collect();
        let contents: Vec<FileContent> = stream::iter(fetches)
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(workspace.len() + repository.len());

        for (file, fetched) in workspace.iter().zip(contents) {
            let key = self.paths.normalize(&file.path);
            let counterpart = repo_by_path.get(&key).copied();
            let status = match counterpart {
                None => FileStatus::New,
                Some(repo_file)
                    if normalize_content(&fetched.content)
                        != normalize_content(&repo_file.content) =>
                {
                    FileStatus::Modified
                }
                Some(_) => FileStatus::Unchanged,
            };

            records.push(ComparisonRecord {
                path: file.path.clone(),
                name: file.name.clone(),
                kind: file.kind,
                source: Source::Workspace,
                category: Category::classify(&key),
                status,
                last_modified: fetched.last_modified,
                repository_file: counterpart.cloned(),
            });
        }

        for repo_file in repository {
            let key = self.paths.normalize(&repo_file.path);
            if workspace_by_path.contains_key(&key) {
                continue;
            }
            records.push(ComparisonRecord {
                path: repo_file.path.clone(),
                name: file_name(&key).to_string(),
                kind: FileKind::File,
                source: Source::Repository,
                category: Category::classify(&key),
                status: FileStatus::Deleted,
                last_modified: repo_file
                    .last_modified
                    .clone()
                    .unwrap_or_else(now_timestamp),
                repository_file: None,
            });
        }

        tracing::debug!(
            workspace = workspace.len(),
            repository = repository.len(),
            records = records.len(),
            "comparison complete"
        );

        Ok(records)
    }
}

async fn fetch_or_empty<F>(fetcher: &F, path: &str) -> FileContent
where
    F: ContentFetcher + ?Sized,
{
    match fetcher.fetch(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path, error = %format!("{e:#}"), "content fetch failed, comparing as empty");
            FileContent {
                content: String::new(),
                last_modified: now_timestamp(),
            }
        }
    }
}

fn validate(workspace: &[WorkspaceFile], repository: &[RepoFile]) -> Result<(), CompareError> {
    if let Some(index) = workspace.iter().position(|f| f.path.trim().is_empty()) {
        return Err(CompareError::MalformedDescriptor {
            side: "workspace",
            index,
            reason: "empty path",
        });
    }
    if let Some(index) = repository.iter().position(|f| f.path.trim().is_empty()) {
        return Err(CompareError::MalformedDescriptor {
            side: "repository",
            index,
            reason: "empty path",
        });
    }
    Ok(())
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FakeFetcher {
        files: HashMap<String, String>,
        /// Per-path delay in milliseconds, to force out-of-order completion.
        delays: HashMap<String, u64>,
    }

    impl FakeFetcher {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
                delays: HashMap::new(),
            }
        }

        fn with_delay(mut self, path: &str, ms: u64) -> Self {
            self.delays.insert(path.to_string(), ms);
            self
        }
    }

    #[async_trait]
    impl ContentFetcher for FakeFetcher {
        async fn fetch(&self, path: &str) -> anyhow::Result<FileContent> {
            if let Some(ms) = self.delays.get(path) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            match self.files.get(path) {
                Some(content) => Ok(FileContent {
                    content: content.clone(),
                    last_modified: "2024-05-01T12:00:00".to_string(),
                }),
                None => anyhow::bail!("Failed to read file"),
            }
        }
    }

    fn ws(path: &str) -> WorkspaceFile {
        WorkspaceFile {
            path: path.to_string(),
            kind: FileKind::File,
            name: file_name(path).to_string(),
            last_modified: "2024-05-01T12:00:00".to_string(),
        }
    }

    fn repo(path: &str, content: &str) -> RepoFile {
        RepoFile {
            path: path.to_string(),
            content: content.to_string(),
            sha: "x".to_string(),
            last_modified: None,
        }
    }

    #[tokio::test]
    async fn test_disjoint_sets() {
        let workspace = vec![ws("/app/src/a.ts"), ws("/app/src/b.ts")];
        let repository = vec![repo("src/c.ts", "c"), repo("src/d.ts", "d"), repo("src/e.ts", "e")];
        let fetcher = FakeFetcher::new(&[("/app/src/a.ts", "a"), ("/app/src/b.ts", "b")]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records.len(), 5);
        let new = records.iter().filter(|r| r.status == FileStatus::New).count();
        let deleted = records.iter().filter(|r| r.status == FileStatus::Deleted).count();
        assert_eq!(new, 2);
        assert_eq!(deleted, 3);
        assert!(records[..2].iter().all(|r| r.source == Source::Workspace));
        assert!(records[2..].iter().all(|r| r.source == Source::Repository));
    }

    #[tokio::test]
    async fn test_identical_sets_unchanged() {
        let workspace = vec![ws("src/a.ts"), ws("src/b.ts")];
        let repository = vec![repo("src/a.ts", "alpha\n"), repo("src/b.ts", "beta")];
        let fetcher = FakeFetcher::new(&[("src/a.ts", "alpha\n"), ("src/b.ts", "beta")]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == FileStatus::Unchanged));
        assert!(records.iter().all(|r| r.repository_file.is_some()));
    }

    #[tokio::test]
    async fn test_line_endings_and_trailing_whitespace() {
        let workspace = vec![ws("/app/src/crlf.ts"), ws("/app/src/ws.ts")];
        let repository = vec![repo("src/crlf.ts", "a\nb"), repo("src/ws.ts", "a\nb")];
        let fetcher = FakeFetcher::new(&[
            ("/app/src/crlf.ts", "a\r\nb\r\n"),
            ("/app/src/ws.ts", "a\nb   \n\n"),
        ]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records[0].status, FileStatus::Unchanged);
        assert_eq!(records[1].status, FileStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_modified() {
        let workspace = vec![ws("/app/ui/src/pages/App.tsx")];
        let repository = vec![repo("ui/src/pages/App.tsx", "old")];
        let fetcher = FakeFetcher::new(&[("/app/ui/src/pages/App.tsx", "new")]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, FileStatus::Modified);
        assert_eq!(records[0].category, Category::Page);
    }

    #[tokio::test]
    async fn test_matched_repository_file_is_attached() {
        let workspace = vec![ws("/app/src/a.ts")];
        let repository = vec![repo("src/a.ts", "foo")];
        let fetcher = FakeFetcher::new(&[("/app/src/a.ts", "foo\n")]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source, Source::Workspace);
        assert_eq!(record.status, FileStatus::Unchanged);
        assert_eq!(record.repository_file.as_ref().map(|f| f.sha.as_str()), Some("x"));
        assert_eq!(record.last_modified, "2024-05-01T12:00:00");
    }

    #[tokio::test]
    async fn test_deleted_keeps_repository_timestamp() {
        let mut old = repo("src/old.ts", "x");
        old.last_modified = Some("2024-01-01T00:00:00Z".to_string());
        let fetcher = FakeFetcher::new(&[]);

        let records = Comparator::default().compare(&[], &[old], &fetcher).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, Source::Repository);
        assert_eq!(records[0].status, FileStatus::Deleted);
        assert_eq!(records[0].last_modified, "2024-01-01T00:00:00Z");
        assert_eq!(records[0].name, "old.ts");
        assert!(records[0].repository_file.is_none());
    }

    #[tokio::test]
    async fn test_deleted_without_timestamp_uses_now() {
        let fetcher = FakeFetcher::new(&[]);
        let records = Comparator::default()
            .compare(&[], &[repo("src/apis/x.py", "x")], &fetcher)
            .await
            .unwrap();

        assert_eq!(records[0].category, Category::Backend);
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].last_modified).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let workspace = vec![ws("/app/src/gone.ts"), ws("/app/src/ok.ts")];
        let repository = vec![repo("src/gone.ts", "content"), repo("src/ok.ts", "ok")];
        let fetcher = FakeFetcher::new(&[("/app/src/ok.ts", "ok")]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, FileStatus::Modified);
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].last_modified).is_ok());
        assert_eq!(records[1].status, FileStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_fetch_failure_against_empty_repository_file() {
        let workspace = vec![ws("src/empty.ts")];
        let repository = vec![repo("src/empty.ts", "  \n")];
        let fetcher = FakeFetcher::new(&[]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records[0].status, FileStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_order_preserved_with_out_of_order_fetches() {
        let workspace = vec![ws("a.ts"), ws("b.ts"), ws("c.ts")];
        let fetcher = FakeFetcher::new(&[("a.ts", "a"), ("b.ts", "b"), ("c.ts", "c")])
            .with_delay("a.ts", 40)
            .with_delay("b.ts", 20);

        let records = Comparator::new(PathNormalizer::default(), 3)
            .compare(&workspace, &[], &fetcher)
            .await
            .unwrap();

        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a.ts", "b.ts", "c.ts"]);
    }

    #[tokio::test]
    async fn test_backslash_workspace_path_matches() {
        let workspace = vec![ws("ui\\src\\components\\Button.tsx")];
        let repository = vec![repo("ui/src/components/Button.tsx", "same")];
        let fetcher = FakeFetcher::new(&[("ui\\src\\components\\Button.tsx", "same")]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, FileStatus::Unchanged);
        assert_eq!(records[0].category, Category::Component);
    }

    #[tokio::test]
    async fn test_duplicate_repository_paths_last_wins() {
        let workspace = vec![ws("/app/src/a.ts")];
        let repository = vec![repo("src/a.ts", "first"), repo("/app/src/a.ts", "second")];
        let fetcher = FakeFetcher::new(&[("/app/src/a.ts", "second")]);

        let records = Comparator::default()
            .compare(&workspace, &repository, &fetcher)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, FileStatus::Unchanged);
        assert_eq!(
            records[0].repository_file.as_ref().map(|f| f.content.as_str()),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_compare_runs_on_spawned_task() {
        let fetcher = std::sync::Arc::new(FakeFetcher::new(&[("/app/src/a.ts", "a")]));
        let workspace = vec![ws("/app/src/a.ts")];
        let repository = vec![repo("src/a.ts", "b")];

        let records = tokio::spawn(async move {
            Comparator::default()
                .compare(&workspace, &repository, fetcher.as_ref())
                .await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, FileStatus::Modified);
    }

    #[tokio::test]
    async fn test_empty_path_fails_loudly() {
        let fetcher = FakeFetcher::new(&[]);
        let err = Comparator::default()
            .compare(&[ws("a.ts"), ws("  ")], &[], &fetcher)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CompareError::MalformedDescriptor { side: "workspace", index: 1, .. }
        ));
    }
}
