//! Git repository reconciler.

use crate::error::{Error, Result};
use crate::refs::heads_ref;
use crate::remote::Remote;
use crate::types::{
    FileChange, GitRepository, InitType, NewRepository, Push, PushResult, RepositoryPatch,
    RepositorySpec, ZERO_OBJECT_ID,
};
use reconcile::{OperationContext, Reconciler, UpdateOutcome};
use std::time::Duration;

/// Branch receiving the initial commit of a `Clean` repository.
const INITIAL_BRANCH: &str = "refs/heads/master";

/// Time allowed for removing a repository whose creation failed part way.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);

fn validate(desired: &RepositorySpec) -> Result<()> {
    if desired.name.trim().is_empty() {
        return Err(Error::invalid_input("repository name is required"));
    }
    if desired.project_id.trim().is_empty() {
        return Err(Error::invalid_input("project_id is required"));
    }
    Ok(())
}

/// Reconciler for `git_repository`.
#[derive(Clone)]
pub struct RepositoryReconciler {
    remote: Remote,
}

impl RepositoryReconciler {
    pub(crate) fn new(remote: Remote) -> Self {
        Self { remote }
    }

    fn get(&self, ctx: &OperationContext, id: &str) -> Result<Option<GitRepository>> {
        let what = format!("get repository {id}");
        self.remote.read(ctx, &what, |b| b.get_repository(id))
    }

    /// Steps that follow the create call itself.
    fn finish_create(
        &self,
        ctx: &OperationContext,
        desired: &RepositorySpec,
        created: &GitRepository,
    ) -> Result<GitRepository> {
        if desired.initialization == InitType::Clean {
            let pushed = self.initialize(ctx, created)?;
            log::info!("Initialized {} with commit {}", created.name, pushed.commit_id);
        }

        let mut repository = if let Some(branch) = &desired.default_branch {
            let patch = RepositoryPatch {
                name: None,
                default_branch: Some(heads_ref(branch)),
            };
            let what = format!("set default branch of {}", created.id);
            self.remote
                .write(ctx, &what, |b| b.update_repository(&created.id, &patch))?
        } else {
            self.get(ctx, &created.id)?
                .unwrap_or_else(|| created.clone())
        };

        repository.initialization = desired.initialization;
        Ok(repository)
    }

    /// Delete a repository whose creation did not complete.
    ///
    /// Runs under its own context so a cancelled or expired caller context
    /// does not prevent the cleanup.
    fn discard(&self, repository: &GitRepository) {
        let ctx = OperationContext::with_timeout(CLEANUP_TIMEOUT);
        let what = format!("discard repository {}", repository.id);
        match self
            .remote
            .write(&ctx, &what, |b| b.delete_repository(&repository.id))
        {
            Ok(()) => log::warn!(
                "Removed partially created repository {} ({})",
                repository.name,
                repository.id
            ),
            Err(e) => log::error!(
                "Repository {} ({}) was created but could not be removed: {e}",
                repository.name,
                repository.id
            ),
        }
    }

    /// Push a README to the initial branch.
    fn initialize(&self, ctx: &OperationContext, repository: &GitRepository) -> Result<PushResult> {
        let push = Push {
            ref_name: INITIAL_BRANCH.to_string(),
            old_object_id: ZERO_OBJECT_ID.to_string(),
            comment: "Initial commit.".to_string(),
            changes: vec![FileChange {
                path: "/README.md".to_string(),
                content: format!("# {}\n", repository.name),
            }],
        };
        let what = format!("initialize repository {}", repository.id);
        self.remote.write_verified(
            ctx,
            &what,
            |b| b.push(&repository.id, &push),
            |b| {
                let filter = INITIAL_BRANCH.trim_start_matches("refs/");
                Ok(b.list_refs(&repository.id, filter)?
                    .into_iter()
                    .find(|r| r.name == INITIAL_BRANCH)
                    .map(|r| PushResult {
                        push_id: 0,
                        commit_id: r.object_id,
                    }))
            },
        )
    }
}

impl Reconciler for RepositoryReconciler {
    type Desired = RepositorySpec;
    type Entity = GitRepository;
    type Error = Error;

    fn resource_type(&self) -> &'static str {
        "git_repository"
    }

    fn create(&self, ctx: &OperationContext, desired: &RepositorySpec) -> Result<GitRepository> {
        validate(desired)?;

        let request = NewRepository {
            name: desired.name.clone(),
            project_id: desired.project_id.clone(),
        };
        let what = format!("create repository {}", desired.name);
        let repository = self
            .remote
            .write(ctx, &what, |b| b.create_repository(&request))?;
        log::info!("Created repository {} ({})", repository.name, repository.id);

        match self.finish_create(ctx, desired, &repository) {
            Ok(repository) => Ok(repository),
            Err(e) => {
                self.discard(&repository);
                Err(e)
            }
        }
    }

    fn preflight(&self, ctx: &OperationContext, desired: &RepositorySpec) -> Result<()> {
        validate(desired)?;
        let what = format!("get project {}", desired.project_id);
        self.remote
            .read(ctx, &what, |b| b.get_project(&desired.project_id))?
            .map(|_| ())
            .ok_or_else(|| Error::not_found("project", &desired.project_id))
    }

    fn read(&self, ctx: &OperationContext, id: &str) -> Result<Option<GitRepository>> {
        self.get(ctx, id)
    }

    fn update(
        &self,
        ctx: &OperationContext,
        current: &GitRepository,
        desired: &RepositorySpec,
    ) -> Result<UpdateOutcome<GitRepository>> {
        if desired.project_id != current.project_id {
            return Ok(UpdateOutcome::RequiresReplace {
                fields: vec!["project_id"],
            });
        }

        let default_branch = desired.default_branch.as_deref().map(heads_ref);
        let patch = RepositoryPatch {
            name: (desired.name != current.name).then(|| desired.name.clone()),
            default_branch: default_branch.filter(|b| current.default_branch.as_ref() != Some(b)),
        };

        let mut repository = if patch.is_empty() {
            self.get(ctx, &current.id)?
                .ok_or_else(|| Error::not_found("repository", &current.id))?
        } else {
            let what = format!("update repository {}", current.id);
            let updated = self
                .remote
                .write(ctx, &what, |b| b.update_repository(&current.id, &patch))?;
            log::info!("Updated repository {}", current.id);
            updated
        };

        repository.initialization = current.initialization;
        Ok(UpdateOutcome::Updated(repository))
    }

    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<()> {
        let what = format!("delete repository {id}");
        match self.remote.write(ctx, &what, |b| b.delete_repository(id)) {
            Ok(()) => {
                log::info!("Deleted repository {id}");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
