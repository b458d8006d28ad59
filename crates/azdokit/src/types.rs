//! Core types for Azure DevOps entities and their desired state.

use reconcile::Entity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Object id used by the Git refs API to mean "no object".
///
/// As `old_object_id` it creates a ref; as `new_object_id` it deletes one.
pub const ZERO_OBJECT_ID: &str = "0000000000000000000000000000000000000000";

// =============================================================================
// Organization / client configuration
// =============================================================================

/// Organization metadata as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization (collection) id.
    pub id: String,
    /// Organization name.
    pub name: String,
    /// Id of the organization owner.
    pub owner_id: String,
    /// Organization status (e.g. "enabled").
    pub status: String,
    /// Microsoft Entra tenant backing the organization.
    pub tenant_id: String,
}

/// Attributes exposed by the client configuration data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Data source id (the organization id).
    pub id: String,
    /// Organization name.
    pub name: String,
    /// Organization id.
    pub organization_id: String,
    /// Organization URL the client is configured with.
    pub organization_url: String,
    /// Id of the organization owner.
    pub owner_id: String,
    /// Organization status.
    pub status: String,
    /// Tenant id.
    pub tenant_id: String,
}

// =============================================================================
// Projects
// =============================================================================

/// Project visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only members can see the project.
    #[default]
    Private,
    /// Anyone can see the project.
    Public,
}

impl Visibility {
    /// Wire/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            other => Err(format!("unknown visibility '{other}' (expected private or public)")),
        }
    }
}

/// Version control system of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VersionControl {
    /// Git repositories.
    #[default]
    Git,
    /// Team Foundation Version Control.
    Tfvc,
}

impl VersionControl {
    /// Wire/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "Git",
            Self::Tfvc => "Tfvc",
        }
    }
}

impl fmt::Display for VersionControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "git" => Ok(Self::Git),
            "tfvc" => Ok(Self::Tfvc),
            other => Err(format!("unknown version control '{other}' (expected Git or Tfvc)")),
        }
    }
}

/// Desired state of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Project name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Visibility.
    #[serde(default)]
    pub visibility: Visibility,
    /// Version control system (forces replacement).
    #[serde(default)]
    pub version_control: VersionControl,
    /// Process template name, e.g. "Agile" (forces replacement).
    #[serde(default = "default_work_item_template")]
    pub work_item_template: String,
}

fn default_work_item_template() -> String {
    "Agile".to_string()
}

impl ProjectSpec {
    /// Create a spec with default visibility, Git and the Agile process.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            visibility: Visibility::default(),
            version_control: VersionControl::default(),
            work_item_template: default_work_item_template(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the version control system.
    pub fn version_control(mut self, version_control: VersionControl) -> Self {
        self.version_control = version_control;
        self
    }

    /// Set the process template name.
    pub fn work_item_template(mut self, template: impl Into<String>) -> Self {
        self.work_item_template = template.into();
        self
    }
}

/// A project as the service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project id.
    pub id: String,
    /// Project name.
    pub name: String,
    /// Description (empty when unset).
    pub description: String,
    /// Visibility.
    pub visibility: Visibility,
    /// Version control system.
    pub version_control: VersionControl,
    /// Process template name.
    pub work_item_template: String,
    /// Process template id.
    pub process_template_id: String,
}

impl Entity for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A process (work item template) available in the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process type id.
    pub id: String,
    /// Process name, e.g. "Agile".
    pub name: String,
    /// Whether this is the organization default.
    pub is_default: bool,
}

/// Payload for queueing project creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    /// Project name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Visibility.
    pub visibility: Visibility,
    /// Version control system.
    pub version_control: VersionControl,
    /// Process template id.
    pub process_template_id: String,
}

/// In-place changes to a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New visibility.
    pub visibility: Option<Visibility>,
}

impl ProjectPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.visibility.is_none()
    }
}

/// Status of a queued long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// Not set.
    NotSet,
    /// Waiting to run.
    Queued,
    /// Running.
    InProgress,
    /// Cancelled.
    Cancelled,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl OperationStatus {
    /// Whether the operation reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotSet => "notSet",
            Self::Queued => "queued",
            Self::InProgress => "inProgress",
            Self::Cancelled => "cancelled",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Operation id.
    pub id: String,
    /// Current status.
    pub status: OperationStatus,
    /// Message explaining a failure, if any.
    pub result_message: Option<String>,
}

// =============================================================================
// Git repositories
// =============================================================================

/// How a new repository is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InitType {
    /// Empty repository with no commits.
    #[default]
    Uninitialized,
    /// Initial commit on `master` containing a README.
    Clean,
}

impl InitType {
    /// Display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Clean => "Clean",
        }
    }
}

impl fmt::Display for InitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clean" => Ok(Self::Clean),
            "uninitialized" => Ok(Self::Uninitialized),
            other => Err(format!(
                "unknown init type '{other}' (expected Clean or Uninitialized)"
            )),
        }
    }
}

/// Desired state of a git repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    /// Owning project (forces replacement).
    pub project_id: String,
    /// Repository name.
    pub name: String,
    /// Default branch, e.g. "refs/heads/main".
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Initialization applied at creation.
    #[serde(default)]
    pub initialization: InitType,
}

impl RepositorySpec {
    /// Create a spec for an uninitialized repository.
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            default_branch: None,
            initialization: InitType::default(),
        }
    }

    /// Set the initialization.
    pub fn initialization(mut self, initialization: InitType) -> Self {
        self.initialization = initialization;
        self
    }

    /// Set the default branch.
    pub fn default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }
}

/// A git repository as the service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepository {
    /// Repository id.
    pub id: String,
    /// Owning project id.
    pub project_id: String,
    /// Repository name.
    pub name: String,
    /// Default branch (absent until the first push).
    pub default_branch: Option<String>,
    /// REST URL.
    pub url: String,
    /// Clone URL.
    pub remote_url: String,
    /// Size in bytes.
    pub size: u64,
    /// Initialization requested at creation (not observable remotely).
    pub initialization: InitType,
}

impl Entity for GitRepository {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Payload for creating a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    /// Repository name.
    pub name: String,
    /// Owning project id.
    pub project_id: String,
}

/// In-place changes to a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPatch {
    /// New name.
    pub name: Option<String>,
    /// New default branch.
    pub default_branch: Option<String>,
}

impl RepositoryPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.default_branch.is_none()
    }
}

/// A file added by a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repository path, e.g. "/README.md".
    pub path: String,
    /// Raw text content.
    pub content: String,
}

/// A single-commit push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    /// Full ref name being pushed.
    pub ref_name: String,
    /// Expected current object id of the ref.
    pub old_object_id: String,
    /// Commit message.
    pub comment: String,
    /// Files added by the commit.
    pub changes: Vec<FileChange>,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResult {
    /// Push id.
    pub push_id: u64,
    /// Id of the commit created by the push.
    pub commit_id: String,
}

// =============================================================================
// Git refs
// =============================================================================

/// A ref as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    /// Full ref name, e.g. "refs/heads/master".
    pub name: String,
    /// Object the ref points at (a tag object for annotated tags).
    pub object_id: String,
    /// Commit an annotated tag points at.
    pub peeled_object_id: Option<String>,
}

impl GitRef {
    /// The commit this ref ultimately points at.
    pub fn commit_id(&self) -> &str {
        self.peeled_object_id.as_deref().unwrap_or(&self.object_id)
    }
}

/// A commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit id.
    pub commit_id: String,
    /// Commit message.
    pub comment: Option<String>,
}

/// Request to move a ref from one object to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    /// Full ref name.
    pub name: String,
    /// Expected current object id ([`ZERO_OBJECT_ID`] to create).
    pub old_object_id: String,
    /// New object id ([`ZERO_OBJECT_ID`] to delete).
    pub new_object_id: String,
}

impl RefUpdate {
    /// Create `name` pointing at `commit_id`.
    pub fn create(name: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_object_id: ZERO_OBJECT_ID.to_string(),
            new_object_id: commit_id.into(),
        }
    }

    /// Move `name` from `old` to `new`.
    pub fn repoint(name: impl Into<String>, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_object_id: old.into(),
            new_object_id: new.into(),
        }
    }

    /// Delete `name`, currently at `old`.
    pub fn delete(name: impl Into<String>, old: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_object_id: old.into(),
            new_object_id: ZERO_OBJECT_ID.to_string(),
        }
    }
}

/// Outcome of a single ref update, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefUpdateStatus {
    /// Update applied.
    Succeeded,
    /// Update requires a force push.
    ForcePushRequired,
    /// The ref is not at the expected old object id.
    StaleOldObjectId,
    /// The ref name is invalid.
    InvalidRefName,
    /// The update was not processed.
    Unprocessed,
    /// The new object is not a commit.
    UnresolvableToCommit,
    /// Missing write permission.
    WritePermissionRequired,
    /// Missing note management permission.
    ManageNotePermissionRequired,
    /// Missing branch creation permission.
    CreateBranchPermissionRequired,
    /// Missing tag creation permission.
    CreateTagPermissionRequired,
    /// Rejected by a server plugin.
    RejectedByPlugin,
    /// The ref is locked.
    Locked,
    /// The name conflicts with an existing ref.
    RefNameConflict,
    /// Rejected by branch policy.
    RejectedByPolicy,
    /// Succeeded on a ref that did not exist.
    SucceededNonExistentRef,
    /// Succeeded on a corrupt ref.
    SucceededCorruptRef,
    /// A status this client does not know.
    #[serde(other)]
    Unknown,
}

impl RefUpdateStatus {
    /// Whether the update was applied.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::SucceededNonExistentRef | Self::SucceededCorruptRef
        )
    }
}

impl fmt::Display for RefUpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the wire spelling so messages match what the service documents
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        f.write_str(&name)
    }
}

/// Result of a single ref update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdateResult {
    /// Full ref name.
    pub name: String,
    /// Object id before the update.
    pub old_object_id: String,
    /// Object id after the update.
    pub new_object_id: String,
    /// Whether the update was applied.
    pub success: bool,
    /// Detailed status.
    pub update_status: RefUpdateStatus,
    /// Message from a rejecting policy or plugin.
    pub custom_message: Option<String>,
}

// =============================================================================
// Branches
// =============================================================================

/// Desired state of a git repository branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSpec {
    /// Repository holding the branch (forces replacement).
    pub repository_id: String,
    /// Branch name without `refs/heads/` (forces replacement).
    pub name: String,
    /// Create from the tip of this branch.
    #[serde(default)]
    pub ref_branch: Option<String>,
    /// Create from this commit.
    #[serde(default)]
    pub ref_commit_id: Option<String>,
    /// Create from the commit this tag points at.
    #[serde(default)]
    pub ref_tag: Option<String>,
}

impl BranchSpec {
    /// Create a spec with no ref source.
    pub fn new(repository_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Branch off another branch.
    pub fn from_branch(mut self, branch: impl Into<String>) -> Self {
        self.ref_branch = Some(branch.into());
        self
    }

    /// Branch off a commit.
    pub fn from_commit(mut self, commit_id: impl Into<String>) -> Self {
        self.ref_commit_id = Some(commit_id.into());
        self
    }

    /// Branch off a tag.
    pub fn from_tag(mut self, tag: impl Into<String>) -> Self {
        self.ref_tag = Some(tag.into());
        self
    }
}

/// A git repository branch as reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch id: `<repository_id>:<name>`.
    pub id: String,
    /// Repository holding the branch.
    pub repository_id: String,
    /// Branch name.
    pub name: String,
    /// Ref source inputs the branch was created from.
    pub ref_branch: Option<String>,
    /// Ref source inputs the branch was created from.
    pub ref_commit_id: Option<String>,
    /// Ref source inputs the branch was created from.
    pub ref_tag: Option<String>,
    /// Commit at the tip of the branch.
    pub last_commit_id: String,
}

impl Branch {
    /// Build the id for a branch.
    pub fn make_id(repository_id: &str, name: &str) -> String {
        format!("{repository_id}:{name}")
    }

    /// Split a branch id into repository id and branch name.
    pub fn parse_id(id: &str) -> Option<(&str, &str)> {
        let (repository_id, name) = id.split_once(':')?;
        if repository_id.is_empty() || name.is_empty() {
            return None;
        }
        Some((repository_id, name))
    }
}

impl Entity for Branch {
    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Retry
// =============================================================================

/// Configuration for retrying transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_delay() {
        let config = RetryConfig::new(5, Duration::from_secs(1), 2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_config_no_retry() {
        assert_eq!(RetryConfig::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_branch_id_roundtrip() {
        let id = Branch::make_id("7f3c", "feature/login");
        assert_eq!(id, "7f3c:feature/login");
        assert_eq!(Branch::parse_id(&id), Some(("7f3c", "feature/login")));
    }

    #[test]
    fn test_branch_id_rejects_malformed() {
        assert_eq!(Branch::parse_id("no-separator"), None);
        assert_eq!(Branch::parse_id(":name"), None);
        assert_eq!(Branch::parse_id("repo:"), None);
    }

    #[test]
    fn test_git_ref_commit_id_prefers_peeled() {
        let lightweight = GitRef {
            name: "refs/tags/v1".to_string(),
            object_id: "aaa".to_string(),
            peeled_object_id: None,
        };
        assert_eq!(lightweight.commit_id(), "aaa");

        let annotated = GitRef {
            peeled_object_id: Some("bbb".to_string()),
            ..lightweight
        };
        assert_eq!(annotated.commit_id(), "bbb");
    }

    #[test]
    fn test_ref_update_constructors() {
        let create = RefUpdate::create("refs/heads/a", "c1");
        assert_eq!(create.old_object_id, ZERO_OBJECT_ID);
        assert_eq!(create.new_object_id, "c1");

        let delete = RefUpdate::delete("refs/heads/a", "c1");
        assert_eq!(delete.old_object_id, "c1");
        assert_eq!(delete.new_object_id, ZERO_OBJECT_ID);
    }

    #[test]
    fn test_ref_update_status_wire_names() {
        let status: RefUpdateStatus = serde_json::from_str("\"staleOldObjectId\"").unwrap();
        assert_eq!(status, RefUpdateStatus::StaleOldObjectId);
        assert_eq!(status.to_string(), "staleOldObjectId");

        let unknown: RefUpdateStatus = serde_json::from_str("\"somethingNew\"").unwrap();
        assert_eq!(unknown, RefUpdateStatus::Unknown);
        assert!(!unknown.is_success());
        assert!(RefUpdateStatus::SucceededNonExistentRef.is_success());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Private".parse::<Visibility>(), Ok(Visibility::Private));
        assert_eq!("git".parse::<VersionControl>(), Ok(VersionControl::Git));
        assert_eq!("CLEAN".parse::<InitType>(), Ok(InitType::Clean));
        assert!("import".parse::<InitType>().is_err());
    }

    #[test]
    fn test_project_spec_defaults() {
        let spec = ProjectSpec::new("demo");
        assert_eq!(spec.visibility, Visibility::Private);
        assert_eq!(spec.version_control, VersionControl::Git);
        assert_eq!(spec.work_item_template, "Agile");
    }
}
