//! Remote API client for Azure DevOps.
//!
//! This module provides the [`Backend`] trait, one method per remote call the
//! reconcilers make, and two implementations: [`rest::RestBackend`] talking
//! to the service over HTTPS, and [`MockBackend`] holding an organization in
//! memory.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use azdokit::backend::{Backend, MockBackend};
//!
//! let mock = MockBackend::new();
//! let repo = mock.seed_repository("demo", "app");
//! let master = mock.seed_commit(&repo.id, "refs/heads/master", "initial");
//!
//! let refs = mock.list_refs(&repo.id, "heads/master").unwrap();
//! assert_eq!(refs[0].object_id, master);
//! ```

pub mod mock;
pub mod rest;

pub use mock::MockBackend;

use crate::error::Result;
use crate::types::{
    Commit, GitRef, GitRepository, NewProject, NewRepository, Operation, Organization, Process,
    Project, ProjectPatch, Push, PushResult, RefUpdate, RefUpdateResult, RepositoryPatch,
};

/// Backend trait for Azure DevOps remote calls.
///
/// Lookups of a single entity return `Ok(None)` when it does not exist; every
/// other failure is an [`crate::Error`] classified by status and body.
pub trait Backend: Send + Sync {
    /// Organization metadata for the configured organization.
    fn organization(&self) -> Result<Organization>;

    /// Get a project by id or name.
    fn get_project(&self, id_or_name: &str) -> Result<Option<Project>>;

    /// List the processes (work item templates) of the organization.
    fn list_processes(&self) -> Result<Vec<Process>>;

    /// Queue creation of a project.
    fn queue_create_project(&self, project: &NewProject) -> Result<Operation>;

    /// Queue an in-place change of a project.
    fn queue_update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Operation>;

    /// Queue deletion of a project.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the project does not exist.
    fn queue_delete_project(&self, id: &str) -> Result<Operation>;

    /// Get the current state of a queued operation.
    fn get_operation(&self, id: &str) -> Result<Operation>;

    /// Get a git repository by id.
    fn get_repository(&self, id: &str) -> Result<Option<GitRepository>>;

    /// Create an empty git repository.
    fn create_repository(&self, repository: &NewRepository) -> Result<GitRepository>;

    /// Change a git repository in place.
    fn update_repository(&self, id: &str, patch: &RepositoryPatch) -> Result<GitRepository>;

    /// Delete a git repository.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the repository does not exist.
    fn delete_repository(&self, id: &str) -> Result<()>;

    /// Push a single commit.
    fn push(&self, repository_id: &str, push: &Push) -> Result<PushResult>;

    /// List refs whose name (without `refs/`) starts with `filter`.
    ///
    /// Annotated tags carry their peeled commit.
    fn list_refs(&self, repository_id: &str, filter: &str) -> Result<Vec<GitRef>>;

    /// Get a commit by id.
    fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<Option<Commit>>;

    /// Create, move or delete refs.
    ///
    /// Rejected updates are reported per ref in the result, not as an error.
    fn update_refs(&self, repository_id: &str, updates: &[RefUpdate])
    -> Result<Vec<RefUpdateResult>>;
}
