use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::async_compare::{CompareRequest, CompareWorker, RemoteSource};
use crate::backend::{BackendClient, Branch};
use crate::cli::{AuthCommand, BranchCommand, Command, PushArgs, StatusArgs};
use crate::compare::types::{ComparisonRecord, FileStatus, RepoFile, WorkspaceFile};
use crate::compare::{Comparator, PathNormalizer};
use crate::config::{self, GhsyncConfig, DEFAULT_BRANCH};
use crate::session::{LoadOutcome, Session};
use crate::state::{Adoption, AppState};

const TOKEN_ENV: &str = "GHSYNC_TOKEN";

pub struct App {
    state: AppState,
    session: Session,
    comparator: Arc<Comparator>,
    config_path: PathBuf,
}

impl App {
    pub fn new(config: &GhsyncConfig, config_path: PathBuf) -> Result<Self> {
        let client = BackendClient::new(&config.backend_url, config.request_timeout)
            .context("Failed to build HTTP client")?;
        let comparator = Comparator::new(PathNormalizer::new(&config.root_prefix), config.concurrency);
        Ok(Self {
            state: AppState::new(config.repository.clone(), config.branch.clone()),
            session: Session::new(client),
            comparator: Arc::new(comparator),
            config_path,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Auth(AuthCommand::Save { token }) => {
                let username = self
                    .session
                    .save_token(token)
                    .await
                    .context("Failed to save token")?;
                println!("Authenticated as {username}; token saved");
            }
            Command::Auth(AuthCommand::Status) => {
                let outcome = self.load_token().await?;
                match outcome {
                    LoadOutcome::Authenticated(user) => println!("Authenticated as {user}"),
                    LoadOutcome::Unverified => {
                        println!("Token present but not verified (backend unreachable)")
                    }
                    LoadOutcome::Cleared => println!("Saved token was rejected"),
                    LoadOutcome::NoToken => println!("No token saved"),
                }
            }
            Command::Repos => {
                self.ensure_authenticated().await?;
                let repos = self
                    .session
                    .list_repositories()
                    .await
                    .context("Failed to fetch repositories")?;
                let selected = self.state.selection.repo_name.as_deref();
                for repo in repos {
                    let marker = if Some(repo.name.as_str()) == selected { "*" } else { " " };
                    match repo.description.as_deref().filter(|d| !d.is_empty()) {
                        Some(desc) => println!("{marker} {}  {desc}", repo.name),
                        None => println!("{marker} {}", repo.name),
                    }
                }
            }
            Command::Select { repo } => self.select_repository(&repo).await?,
            Command::Branch(cmd) => self.branch(cmd).await?,
            Command::Status(args) => self.status(args).await?,
            Command::Watch { interval } => self.watch(Duration::from_secs(interval.max(1))).await?,
            Command::Diff { path, out } => self.diff(&path, out).await?,
            Command::Push(args) => self.push(args).await?,
        }
        Ok(())
    }

    /// Apply `--repo` / `--branch` for this invocation without persisting.
    pub fn override_selection(&mut self, repo: Option<String>, branch: Option<String>) {
        if let Some(repo) = repo {
            self.state.selection.repo_name = Some(repo);
        }
        if let Some(branch) = branch {
            self.state.selection.branch = branch;
        }
    }

    async fn load_token(&mut self) -> Result<LoadOutcome> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                return Ok(self.session.login(token).await);
            }
        }
        self.session
            .load_saved_token()
            .await
            .context("Failed to load saved token")
    }

    async fn ensure_authenticated(&mut self) -> Result<()> {
        if self.session.has_token() {
            return Ok(());
        }
        match self.load_token().await? {
            LoadOutcome::Authenticated(_) | LoadOutcome::Unverified => Ok(()),
            LoadOutcome::Cleared => {
                bail!("saved GitHub token was rejected; run `ghsync auth save <token>`")
            }
            LoadOutcome::NoToken => bail!("no GitHub token; run `ghsync auth save <token>`"),
        }
    }

    fn selected_repo(&self) -> Result<String> {
        self.state
            .selection
            .repo_name
            .clone()
            .context("No repository selected; run `ghsync select <owner/name>`")
    }

    fn persist_selection(&self) {
        let selection = &self.state.selection;
        if let Err(e) = config::save_selection(
            &self.config_path,
            selection.repo_name.as_deref(),
            &selection.branch,
        ) {
            tracing::warn!(error = %format!("{e:#}"), "failed to persist selection");
        }
    }

    /// Report on stderr. A repeated error (e.g. every watch tick while the
    /// backend is down) is shown once.
    fn set_status(&mut self, msg: String, is_error: bool) {
        let repeated = matches!(&self.state.status_message, Some((prev, true)) if is_error && *prev == msg);
        if !repeated {
            if is_error {
                eprintln!("ghsync: {msg}");
            } else {
                eprintln!("{msg}");
            }
        }
        self.state.status_message = Some((msg, is_error));
    }

    async fn select_repository(&mut self, repo: &str) -> Result<()> {
        self.ensure_authenticated().await?;
        let repos = self
            .session
            .list_repositories()
            .await
            .context("Failed to fetch repositories")?;
        if !repos.iter().any(|r| r.name == repo) {
            bail!("Repository {repo} not found among accessible repositories");
        }
        let branches = self
            .session
            .list_branches(repo)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not list branches, assuming {DEFAULT_BRANCH}");
                Vec::new()
            });
        let default_branch = default_branch_name(&branches);
        self.state.select_repository(repo, &default_branch);
        self.persist_selection();
        self.set_status(format!("Selected {repo} ({default_branch})"), false);
        Ok(())
    }

    async fn branch(&mut self, cmd: BranchCommand) -> Result<()> {
        self.ensure_authenticated().await?;
        let repo = self.selected_repo()?;
        match cmd {
            BranchCommand::List => {
                let branches = self
                    .session
                    .list_branches(&repo)
                    .await
                    .context("Failed to fetch branches")?;
                for branch in branches {
                    let marker = if branch.name == self.state.selection.branch { "*" } else { " " };
                    let mut flags = Vec::new();
                    if branch.default {
                        flags.push("default");
                    }
                    if branch.protected {
                        flags.push("protected");
                    }
                    if flags.is_empty() {
                        println!("{marker} {}", branch.name);
                    } else {
                        println!("{marker} {} ({})", branch.name, flags.join(", "));
                    }
                }
            }
            BranchCommand::Create { name, from } => {
                let created = self
                    .session
                    .create_branch(&repo, &name, &from)
                    .await
                    .context("Failed to create branch")?;
                self.set_status(format!("Branch '{created}' created from '{from}'"), false);
            }
            BranchCommand::Switch { name } => {
                let branches = self
                    .session
                    .list_branches(&repo)
                    .await
                    .context("Failed to fetch branches")?;
                if !branches.iter().any(|b| b.name == name) {
                    bail!("Branch {name} does not exist in {repo}");
                }
                if self.state.switch_branch(&name) {
                    self.persist_selection();
                }
                self.set_status(format!("Switched to {name}"), false);
                self.status(StatusArgs {
                    all: false,
                    json: false,
                })
                .await?;
            }
            BranchCommand::Protection { name } => {
                let name = name.unwrap_or_else(|| self.state.selection.branch.clone());
                let rules = self
                    .session
                    .branch_protection(&repo, &name)
                    .await
                    .context("Failed to fetch branch protection")?;
                if !rules.protected {
                    println!("{name}: not protected");
                    return Ok(());
                }
                println!("{name}: protected");
                println!("  required reviews:           {}", rules.required_reviews);
                println!("  dismiss stale reviews:      {}", rules.dismiss_stale_reviews);
                println!("  require code owner reviews: {}", rules.require_code_owner_reviews);
                if !rules.required_status_checks.is_empty() {
                    println!("  required checks:            {}", rules.required_status_checks.join(", "));
                }
            }
        }
        Ok(())
    }

    fn spawn_worker(&self) -> Result<CompareWorker> {
        let token = self.session.token()?;
        let source = RemoteSource::new(self.session.client().clone(), token);
        Ok(CompareWorker::new(Arc::new(source), Arc::clone(&self.comparator)))
    }

    fn request_compare(&mut self, worker: &CompareWorker) -> Result<()> {
        let repo_name = self.selected_repo()?;
        let generation = self.state.compare.begin();
        worker.request(CompareRequest {
            generation,
            repo_name,
            branch: self.state.selection.branch.clone(),
        });
        Ok(())
    }

    /// Wait until the latest triggered comparison resolves.
    async fn await_latest(&mut self, worker: &mut CompareWorker) -> Result<Adoption> {
        loop {
            let result = worker.recv().await.context("comparison worker stopped")?;
            match self.state.compare.apply(result) {
                Adoption::Stale => continue,
                other => return Ok(other),
            }
        }
    }

    async fn compare_once(&mut self) -> Result<()> {
        self.ensure_authenticated().await?;
        let mut worker = self.spawn_worker()?;
        self.request_compare(&worker)?;
        match self.await_latest(&mut worker).await? {
            Adoption::Failed(msg) => bail!(msg),
            _ => Ok(()),
        }
    }

    async fn status(&mut self, args: StatusArgs) -> Result<()> {
        self.compare_once().await?;
        let records = &self.state.compare.records;

        if args.json {
            let shown: Vec<&ComparisonRecord> = records
                .iter()
                .filter(|r| args.all || r.status != FileStatus::Unchanged)
                .collect();
            println!("{}", serde_json::to_string_pretty(&shown)?);
            return Ok(());
        }

        let paths = self.comparator.paths();
        for record in records {
            if !args.all && record.status == FileStatus::Unchanged {
                continue;
            }
            println!("{}", format_record(record, paths));
        }
        println!("{}", self.summary());
        Ok(())
    }

    fn summary(&self) -> String {
        let counts = self.state.compare.counts();
        let n = |s: FileStatus| counts.get(&s).copied().unwrap_or(0);
        format!(
            "{}@{}: {} new, {} modified, {} deleted, {} unchanged",
            self.state.selection.repo_name.as_deref().unwrap_or("?"),
            self.state.selection.branch,
            n(FileStatus::New),
            n(FileStatus::Modified),
            n(FileStatus::Deleted),
            n(FileStatus::Unchanged),
        )
    }

    async fn watch(&mut self, every: Duration) -> Result<()> {
        self.ensure_authenticated().await?;
        self.selected_repo()?;
        let mut worker = self.spawn_worker()?;
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let mut trigger = false;
            tokio::select! {
                _ = interval.tick() => {
                    if self.state.compare.loading {
                        tracing::debug!("previous comparison still running, skipping tick");
                    } else {
                        trigger = true;
                    }
                }
                result = worker.recv() => {
                    let result = result.context("comparison worker stopped")?;
                    match self.state.compare.apply(result) {
                        Adoption::Adopted(count) => {
                            tracing::debug!(generation = self.state.compare.adopted_generation(), count, "comparison adopted");
                            self.state.status_message = None;
                            let stamp = chrono::Local::now().format("%H:%M:%S");
                            println!("[{stamp}] {}", self.summary());
                            let paths = self.comparator.paths();
                            for record in self.state.compare.records.iter().filter(|r| r.status != FileStatus::Unchanged) {
                                println!("  {}", format_record(record, paths));
                            }
                        }
                        Adoption::Failed(msg) => {
                            // previous records stay as they were
                            self.set_status(msg, true);
                        }
                        Adoption::Stale => {}
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    return Ok(());
                }
            }
            if trigger {
                self.request_compare(&worker)?;
            }
        }
    }

    async fn diff(&mut self, path: &str, out: Option<PathBuf>) -> Result<()> {
        self.ensure_authenticated().await?;
        let repo = self.selected_repo()?;
        let token = self.session.token()?;
        let client = self.session.client();
        let paths = self.comparator.paths();
        let key = paths.normalize(path);

        let (workspace, repository) = tokio::join!(
            client.workspace_files(),
            client.repository_files(&token, &repo, &self.state.selection.branch)
        );
        let workspace = workspace.context("Failed to fetch workspace files")?;
        let repository = repository.context("Failed to fetch repository files")?;

        let ws_file = find_workspace_file(&workspace, &key, paths);
        let repo_file = find_repo_file(&repository, &key, paths);
        if ws_file.is_none() && repo_file.is_none() {
            bail!("{path} exists neither in the workspace nor in {repo}");
        }

        let workspace_content = match ws_file {
            Some(file) => client
                .read_file(&file.path)
                .await
                .with_context(|| format!("Failed to read {}", file.path))?
                .content,
            None => String::new(),
        };
        let repo_content = repo_file.map(|f| f.content.as_str()).unwrap_or("");
        let filename = key.rsplit('/').next().unwrap_or(&key);

        let rendered = client
            .render_diff(&workspace_content, repo_content, filename)
            .await
            .context("Failed to render diff")?;
        let html = format!("<style>{}</style>\n{}\n", rendered.styles, rendered.diff_html);

        match out {
            Some(out) => {
                std::fs::write(&out, html)
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                self.set_status(format!("Diff written to {}", out.display()), false);
            }
            None => print!("{html}"),
        }
        Ok(())
    }

    async fn push(&mut self, args: PushArgs) -> Result<()> {
        self.ensure_authenticated().await?;
        let repo = self.selected_repo()?;

        let files = if args.changed {
            self.compare_once().await?;
            self.state.compare.pushable_paths()
        } else {
            let workspace = self
                .session
                .client()
                .workspace_files()
                .await
                .context("Failed to fetch workspace files")?;
            resolve_workspace_paths(&args.paths, &workspace, self.comparator.paths())?
        };

        if files.is_empty() {
            self.set_status("Nothing to push".to_string(), false);
            return Ok(());
        }

        let branch = self.state.selection.branch.clone();
        let message = self
            .session
            .push(&repo, &branch, &files, &args.message)
            .await
            .context("Push failed")?;
        let author = self.session.username().map(|u| format!(" as {u}")).unwrap_or_default();
        self.set_status(
            format!("{message} ({} files to {repo}@{branch}{author})", files.len()),
            false,
        );
        Ok(())
    }
}

fn default_branch_name(branches: &[Branch]) -> String {
    branches
        .iter()
        .find(|b| b.default)
        .map(|b| b.name.clone())
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
}

fn format_record(record: &ComparisonRecord, paths: &PathNormalizer) -> String {
    format!(
        "{} {:<9} {}",
        record.status.label(),
        record.category.label(),
        paths.normalize(&record.path)
    )
}

fn find_workspace_file<'a>(
    files: &'a [WorkspaceFile],
    key: &str,
    paths: &PathNormalizer,
) -> Option<&'a WorkspaceFile> {
    files.iter().rev().find(|f| paths.normalize(&f.path) == key)
}

fn find_repo_file<'a>(files: &'a [RepoFile], key: &str, paths: &PathNormalizer) -> Option<&'a RepoFile> {
    files.iter().rev().find(|f| paths.normalize(&f.path) == key)
}

/// Map user-supplied paths (normalized or full) to the workspace paths the
/// backend expects. Unknown paths are an error so nothing is pushed partially.
fn resolve_workspace_paths(
    requested: &[String],
    workspace: &[WorkspaceFile],
    paths: &PathNormalizer,
) -> Result<Vec<String>> {
    let mut resolved = Vec::with_capacity(requested.len());
    for path in requested {
        let key = paths.normalize(path);
        let Some(file) = find_workspace_file(workspace, &key, paths) else {
            bail!("{path} is not a workspace file");
        };
        if !resolved.contains(&file.path) {
            resolved.push(file.path.clone());
        }
    }
    Ok(resolved)
}
