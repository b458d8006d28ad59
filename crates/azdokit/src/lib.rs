//! # azdokit
//!
//! Azure DevOps resources as reconcilable entities.
//!
//! This crate provides:
//! - Provider configuration resolved once from the environment
//! - A remote API client ([`backend::Backend`]) with a REST and an in-memory implementation
//! - Ref resolution for branches created from a branch, commit or tag
//! - [`reconcile::Reconciler`] implementations for projects, git repositories and branches
//! - The client configuration data source
//!
//! ## Example
//!
//! ```no_run
//! use azdokit::{BranchSpec, Client, ProviderConfig};
//! use reconcile::{OperationContext, Reconciler};
//! use std::time::Duration;
//!
//! let client = Client::new(ProviderConfig::from_env().unwrap()).unwrap();
//! let ctx = OperationContext::with_timeout(Duration::from_secs(120));
//!
//! let desired = BranchSpec::new("3b6c2b1e-0000-0000-0000-000000000000", "release/1.0")
//!     .from_tag("v1.0.0");
//! let branch = client.branches().create(&ctx, &desired).unwrap();
//! println!("{} at {}", branch.id, branch.last_commit_id);
//! ```
//!
//! ## Errors
//!
//! Every failure is an [`Error`] with an [`ErrorCategory`]. Only
//! [`ErrorCategory::Transient`] failures are retried; unresolvable refs keep
//! the service's wording:
//!
//! ```text
//! No refs found that match ref "refs/tags/0.0.0"
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod client_config;
pub mod config;
pub mod error;
pub mod refs;
pub mod resource;
pub mod retry;
pub mod types;

mod remote;

pub use client_config::ClientConfigSource;
pub use config::{ProviderConfig, RefUpdateStrategy};
pub use error::{Error, ErrorCategory, Result};
pub use refs::{RefResolver, RefSource, RefSpec, ResolvedRef};
pub use resource::{BranchReconciler, ProjectReconciler, RepositoryReconciler};
pub use types::{
    Branch, BranchSpec, ClientConfig, GitRepository, InitType, Project, ProjectSpec,
    RepositorySpec, RetryConfig, VersionControl, Visibility,
};

pub use backend::MockBackend;
use backend::Backend;
use backend::rest::RestBackend;
use reconcile::OperationContext;
use remote::Remote;
use std::sync::Arc;

/// High-level client for one Azure DevOps organization.
///
/// The client owns the configuration and the backend; the reconcilers it
/// hands out share both and can be used from several threads.
///
/// # Example
///
/// ```
/// use azdokit::{Client, MockBackend, ProviderConfig};
/// use reconcile::OperationContext;
/// use std::sync::Arc;
///
/// let config = ProviderConfig::new("https://dev.azure.com/contoso", "pat");
/// let client = Client::with_backend(config, Arc::new(MockBackend::new()));
///
/// let info = client.client_config().read(&OperationContext::new()).unwrap();
/// assert_eq!(info.organization_url, "https://dev.azure.com/contoso");
/// ```
pub struct Client {
    config: ProviderConfig,
    remote: Remote,
}

impl Client {
    /// Create a client talking to the Azure DevOps REST API.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is unusable.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let backend = Arc::new(RestBackend::new(&config));
        Ok(Self::with_backend(config, backend))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(config: ProviderConfig, backend: Arc<dyn Backend>) -> Self {
        let remote = Remote::new(backend, config.retry.clone());
        Self { config, remote }
    }

    /// The configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Ref resolver sharing this client's backend.
    #[must_use]
    pub fn ref_resolver(&self) -> RefResolver {
        RefResolver::new(self.remote.clone())
    }

    /// Reconciler for branches.
    #[must_use]
    pub fn branches(&self) -> BranchReconciler {
        BranchReconciler::new(self.remote.clone(), self.config.update_strategy)
    }

    /// Reconciler for git repositories.
    #[must_use]
    pub fn repositories(&self) -> RepositoryReconciler {
        RepositoryReconciler::new(self.remote.clone())
    }

    /// Reconciler for projects.
    #[must_use]
    pub fn projects(&self) -> ProjectReconciler {
        ProjectReconciler::new(self.remote.clone(), self.config.operation_poll_interval)
    }

    /// Client configuration data source.
    #[must_use]
    pub fn client_config(&self) -> ClientConfigSource {
        ClientConfigSource::new(self.remote.clone(), self.config.organization_url())
    }

    /// Read the client configuration.
    pub fn read_client_config(&self, ctx: &OperationContext) -> Result<ClientConfig> {
        self.client_config().read(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Entity, Reconciler, apply_update};
    use std::time::Duration;

    fn client(mock: &MockBackend) -> Client {
        let config = ProviderConfig::new("https://dev.azure.com/contoso/", "pat")
            .with_poll_interval(Duration::from_millis(1))
            .with_retry(RetryConfig::no_retry());
        Client::with_backend(config, Arc::new(mock.clone()))
    }

    #[test]
    fn test_new_validates_config() {
        assert!(Client::new(ProviderConfig::new("", "pat")).is_err());
    }

    #[test]
    fn test_client_config_uses_trimmed_url() {
        let client = client(&MockBackend::new());
        let info = client.read_client_config(&OperationContext::new()).unwrap();
        assert_eq!(info.organization_url, "https://dev.azure.com/contoso");
    }

    #[test]
    fn test_project_repository_branch_lifecycle() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = OperationContext::new();

        let project = client
            .projects()
            .create(&ctx, &ProjectSpec::new("acc-test"))
            .unwrap();
        let repo = client
            .repositories()
            .create(
                &ctx,
                &RepositorySpec::new(&project.id, "acc-repo").initialization(InitType::Clean),
            )
            .unwrap();

        let branches = client.branches();
        let first = branches
            .create(&ctx, &BranchSpec::new(&repo.id, "testbranch-x").from_branch("master"))
            .unwrap();
        assert!(!first.last_commit_id.is_empty());

        let second = branches
            .create(
                &ctx,
                &BranchSpec::new(&repo.id, "testbranch2-x").from_commit(&first.last_commit_id),
            )
            .unwrap();
        assert_eq!(second.last_commit_id, first.last_commit_id);

        let renamed = apply_update(
            &branches,
            &ctx,
            &first,
            &BranchSpec::new(&repo.id, "testbranch-x2").from_branch("master"),
        )
        .unwrap();
        assert!(branches.read(&ctx, first.id()).unwrap().is_none());
        assert!(branches.read(&ctx, renamed.entity().id()).unwrap().is_some());

        client.projects().delete(&ctx, &project.id).unwrap();
        assert!(client.repositories().read(&ctx, &repo.id).unwrap().is_none());
        assert!(branches.read(&ctx, second.id()).unwrap().is_none());
    }

    #[test]
    fn test_reconcilers_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BranchReconciler>();
        assert_send_sync::<ProjectReconciler>();
        assert_send_sync::<RepositoryReconciler>();
        assert_send_sync::<ClientConfigSource>();
    }
}
