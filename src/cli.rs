use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ghsync",
    version,
    about = "Compare a workspace against a GitHub repository and push selected files"
)]
pub struct Cli {
    /// Backend base URL (overrides config)
    #[arg(long, global = true, env = "GHSYNC_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Repository as owner/name (overrides the saved selection)
    #[arg(short, long, global = true)]
    pub repo: Option<String>,

    /// Branch to compare and push to (overrides the saved selection)
    #[arg(short, long, global = true)]
    pub branch: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the GitHub personal access token
    #[command(subcommand)]
    Auth(AuthCommand),

    /// List repositories accessible with the token
    Repos,

    /// Select the repository to compare against and remember it
    Select {
        /// Repository as owner/name
        repo: String,
    },

    /// List, create and switch branches
    #[command(subcommand)]
    Branch(BranchCommand),

    /// Compare workspace files against the selected repository and branch
    Status(StatusArgs),

    /// Re-run the comparison periodically until interrupted
    Watch {
        /// Seconds between comparisons
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },

    /// Render the backend diff for one file
    Diff {
        /// Workspace or repository path
        path: String,

        /// Write the HTML (with styles) to this file instead of stdout
        #[arg(short, long)]
        out: Option<std::path::PathBuf>,
    },

    /// Push files to the selected branch as one commit
    Push(PushArgs),
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Verify a token and store it in the backend's secret store
    Save {
        /// Token value; read from GHSYNC_TOKEN when omitted
        #[arg(env = "GHSYNC_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Show whether a valid token is available
    Status,
}

#[derive(Subcommand, Debug)]
pub enum BranchCommand {
    /// List branches of the selected repository
    List,
    /// Create a branch from another one
    Create {
        name: String,
        /// Source branch
        #[arg(long, default_value = "main")]
        from: String,
    },
    /// Switch the selected branch and re-run the comparison
    Switch { name: String },
    /// Show protection rules for a branch
    Protection { name: Option<String> },
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Include unchanged files
    #[arg(short, long)]
    pub all: bool,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Workspace paths to push
    pub paths: Vec<String>,

    /// Push every new or modified file
    #[arg(long, conflicts_with = "paths")]
    pub changed: bool,

    /// Commit message
    #[arg(short, long)]
    pub message: String,
}
