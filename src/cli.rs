use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use azdokit::{InitType, RefUpdateStrategy, VersionControl, Visibility};

#[derive(Parser)]
#[command(name = "azdo")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative management of Azure DevOps projects, repositories and branches", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Organization URL (overrides config file and AZDO_ORG_SERVICE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub org_url: Option<String>,

    /// Overall time limit for the command, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// How branches react when only their ref source changes
    #[arg(long, global = true, value_enum)]
    pub update_strategy: Option<StrategyArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the organization the client is configured for
    ClientConfig,

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage git repositories
    #[command(subcommand)]
    Repo(RepoCommand),

    /// Manage git repository branches
    #[command(subcommand)]
    Branch(BranchCommand),

    /// Inspect the CLI configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Args
// ============================================================================

#[derive(Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// Move the branch to the newly resolved commit
    InPlace,
    /// Delete the branch and create it again
    Replace,
}

impl From<StrategyArg> for RefUpdateStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::InPlace => Self::InPlace,
            StrategyArg::Replace => Self::Replace,
        }
    }
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Resource id
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Project Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project
    Create(ProjectArgs),

    /// Show a project by id or name
    Show {
        /// Project id or name
        id: String,
    },

    /// Converge an existing project to the given settings
    Update {
        /// Project id or name
        id: String,

        #[command(flatten)]
        args: ProjectArgs,
    },

    /// Delete a project
    Delete(DeleteArgs),
}

#[derive(Args)]
pub struct ProjectArgs {
    /// Project name
    #[arg(long)]
    pub name: String,

    /// Project description
    #[arg(long)]
    pub description: Option<String>,

    /// Project visibility
    #[arg(long, value_enum, default_value = "private")]
    pub visibility: VisibilityArg,

    /// Version control system
    #[arg(long, value_enum, default_value = "git")]
    pub version_control: VersionControlArg,

    /// Process template name
    #[arg(long, default_value = "Agile")]
    pub work_item_template: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum VisibilityArg {
    Private,
    Public,
}

impl From<VisibilityArg> for Visibility {
    fn from(arg: VisibilityArg) -> Self {
        match arg {
            VisibilityArg::Private => Self::Private,
            VisibilityArg::Public => Self::Public,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum VersionControlArg {
    Git,
    Tfvc,
}

impl From<VersionControlArg> for VersionControl {
    fn from(arg: VersionControlArg) -> Self {
        match arg {
            VersionControlArg::Git => Self::Git,
            VersionControlArg::Tfvc => Self::Tfvc,
        }
    }
}

// ============================================================================
// Repository Commands
// ============================================================================

#[derive(Subcommand)]
pub enum RepoCommand {
    /// Create a git repository
    Create(RepoArgs),

    /// Show a git repository
    Show {
        /// Repository id
        id: String,
    },

    /// Converge an existing repository to the given settings
    Update {
        /// Repository id
        id: String,

        #[command(flatten)]
        args: RepoArgs,
    },

    /// Delete a git repository
    Delete(DeleteArgs),
}

#[derive(Args)]
pub struct RepoArgs {
    /// Owning project id
    #[arg(long)]
    pub project_id: String,

    /// Repository name
    #[arg(long)]
    pub name: String,

    /// Default branch
    #[arg(long)]
    pub default_branch: Option<String>,

    /// Initialization applied at creation
    #[arg(long, value_enum, default_value = "uninitialized")]
    pub init: InitArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InitArg {
    Uninitialized,
    Clean,
}

impl From<InitArg> for InitType {
    fn from(arg: InitArg) -> Self {
        match arg {
            InitArg::Uninitialized => Self::Uninitialized,
            InitArg::Clean => Self::Clean,
        }
    }
}

// ============================================================================
// Branch Commands
// ============================================================================

#[derive(Subcommand)]
pub enum BranchCommand {
    /// Create a branch from a branch, commit or tag
    Create(BranchArgs),

    /// Show a branch by its `<repository_id>:<name>` id
    Show {
        /// Branch id
        id: String,
    },

    /// Converge an existing branch to the given settings
    ///
    /// The service does not remember which branch, commit or tag a branch was
    /// created from. Without `--current-ref-*` the given ref source is taken
    /// as unchanged and the branch is left where it is.
    Update {
        /// Branch id
        id: String,

        #[command(flatten)]
        args: BranchArgs,

        #[command(flatten)]
        current: CurrentRefArgs,
    },

    /// Delete a branch
    Delete(DeleteArgs),

    /// Resolve a branch, commit or tag to a commit id without changing anything
    Resolve {
        /// Repository id
        #[arg(long)]
        repository_id: String,

        #[command(flatten)]
        source: RefArgs,
    },
}

#[derive(Args)]
pub struct BranchArgs {
    /// Repository id
    #[arg(long)]
    pub repository_id: String,

    /// Branch name (without refs/heads/)
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub source: RefArgs,
}

#[derive(Args)]
pub struct RefArgs {
    /// Source branch
    #[arg(long = "ref-branch")]
    pub branch: Option<String>,

    /// Source commit id
    #[arg(long = "ref-commit-id")]
    pub commit_id: Option<String>,

    /// Source tag
    #[arg(long = "ref-tag")]
    pub tag: Option<String>,
}

/// Ref source the branch was last created or moved from
#[derive(Args, Default)]
pub struct CurrentRefArgs {
    /// Branch the branch currently follows
    #[arg(long = "current-ref-branch", id = "current_ref_branch")]
    pub branch: Option<String>,

    /// Commit id the branch was created from
    #[arg(long = "current-ref-commit-id", id = "current_ref_commit_id")]
    pub commit_id: Option<String>,

    /// Tag the branch was created from
    #[arg(long = "current-ref-tag", id = "current_ref_tag")]
    pub tag: Option<String>,
}

impl CurrentRefArgs {
    pub fn is_empty(&self) -> bool {
        self.branch.is_none() && self.commit_id.is_none() && self.tag.is_none()
    }
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration (token redacted)
    Show,

    /// Print the config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_branch_create() {
        let cli = Cli::try_parse_from([
            "azdo",
            "branch",
            "create",
            "--repository-id",
            "r1",
            "--name",
            "feature",
            "--ref-tag",
            "v1.0.0",
        ])
        .unwrap();

        let Command::Branch(BranchCommand::Create(args)) = cli.command else {
            panic!("expected branch create");
        };
        assert_eq!(args.repository_id, "r1");
        assert_eq!(args.source.tag.as_deref(), Some("v1.0.0"));
        assert!(args.source.branch.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "azdo",
            "project",
            "show",
            "demo",
            "--json",
            "-vv",
            "--update-strategy",
            "replace",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.update_strategy, Some(StrategyArg::Replace)));
    }

    #[test]
    fn test_parse_branch_update_with_current_ref() {
        let cli = Cli::try_parse_from([
            "azdo",
            "branch",
            "update",
            "r1:feature",
            "--repository-id",
            "r1",
            "--name",
            "feature",
            "--ref-branch",
            "release",
            "--current-ref-branch",
            "master",
        ])
        .unwrap();

        let Command::Branch(BranchCommand::Update { id, args, current }) = cli.command else {
            panic!("expected branch update");
        };
        assert_eq!(id, "r1:feature");
        assert_eq!(args.source.branch.as_deref(), Some("release"));
        assert_eq!(current.branch.as_deref(), Some("master"));
        assert!(!current.is_empty());
    }

    #[test]
    fn test_project_defaults() {
        let cli = Cli::try_parse_from(["azdo", "project", "create", "--name", "demo"]).unwrap();
        let Command::Project(ProjectCommand::Create(args)) = cli.command else {
            panic!("expected project create");
        };
        assert_eq!(args.work_item_template, "Agile");
        assert_eq!(Visibility::from(args.visibility), Visibility::Private);
        assert_eq!(VersionControl::from(args.version_control), VersionControl::Git);
    }
}
