//! Git repository branch reconciler.
//!
//! A branch is a single ref, `refs/heads/<name>`, created from another
//! branch, a commit or a tag. All ref changes go through the refs API with an
//! explicit expected old object id, so a branch that moved underneath us is
//! reported as a conflict instead of being overwritten.

use crate::backend::Backend;
use crate::config::RefUpdateStrategy;
use crate::error::{Error, Result};
use crate::refs::{RefResolver, RefSpec, heads_ref, validate_branch_name};
use crate::remote::Remote;
use crate::types::{Branch, BranchSpec, RefUpdate, RefUpdateResult, RefUpdateStatus};
use reconcile::{OperationContext, Reconciler, UpdateOutcome};

/// Reconciler for `git_repository_branch`.
#[derive(Clone)]
pub struct BranchReconciler {
    remote: Remote,
    resolver: RefResolver,
    strategy: RefUpdateStrategy,
}

impl BranchReconciler {
    pub(crate) fn new(remote: Remote, strategy: RefUpdateStrategy) -> Self {
        Self {
            resolver: RefResolver::new(remote.clone()),
            remote,
            strategy,
        }
    }

    /// How ref-only changes are applied.
    pub fn strategy(&self) -> RefUpdateStrategy {
        self.strategy
    }

    /// Current tip of `ref_name`, or `None` if the ref does not exist.
    fn tip(&self, ctx: &OperationContext, repository_id: &str, ref_name: &str) -> Result<Option<String>> {
        let what = format!("read {ref_name}");
        self.remote
            .read(ctx, &what, |b| find_tip(b, repository_id, ref_name))
    }

    /// Move `ref_name` from `old` to `new`, verifying after transient failures.
    fn move_ref(
        &self,
        ctx: &OperationContext,
        repository_id: &str,
        update: RefUpdate,
    ) -> Result<RefUpdateResult> {
        let what = format!(
            "update {} {} -> {}",
            update.name, update.old_object_id, update.new_object_id
        );
        self.remote.write_verified(
            ctx,
            &what,
            |b| {
                let results = b.update_refs(repository_id, std::slice::from_ref(&update))?;
                results
                    .into_iter()
                    .find(|r| r.name == update.name)
                    .ok_or_else(|| {
                        Error::InvalidResponse(format!("no result for ref {}", update.name))
                    })
            },
            |b| {
                let tip = find_tip(b, repository_id, &update.name)?;
                let landed = match tip.as_deref() {
                    None => update.new_object_id == crate::types::ZERO_OBJECT_ID,
                    Some(tip) => tip == update.new_object_id,
                };
                Ok(landed.then(|| RefUpdateResult {
                    name: update.name.clone(),
                    old_object_id: update.old_object_id.clone(),
                    new_object_id: update.new_object_id.clone(),
                    success: true,
                    update_status: RefUpdateStatus::Succeeded,
                    custom_message: None,
                }))
            },
        )
    }

    /// Validate `desired` and resolve the commit it should point at.
    fn target(&self, ctx: &OperationContext, desired: &BranchSpec) -> Result<String> {
        if desired.repository_id.trim().is_empty() {
            return Err(Error::invalid_input("repository_id is required"));
        }
        validate_branch_name(&desired.name)?;
        self.resolve(ctx, desired)
    }

    fn resolve(&self, ctx: &OperationContext, desired: &BranchSpec) -> Result<String> {
        let resolved = self
            .resolver
            .resolve(ctx, &desired.repository_id, &RefSpec::from(desired))?;
        Ok(resolved.commit_id)
    }
}

fn find_tip(backend: &dyn Backend, repository_id: &str, ref_name: &str) -> Result<Option<String>> {
    let filter = ref_name.strip_prefix("refs/").unwrap_or(ref_name);
    Ok(backend
        .list_refs(repository_id, filter)?
        .into_iter()
        .find(|r| r.name == ref_name)
        .map(|r| r.object_id))
}

fn entity(desired: &BranchSpec, last_commit_id: String) -> Branch {
    Branch {
        id: Branch::make_id(&desired.repository_id, &desired.name),
        repository_id: desired.repository_id.clone(),
        name: desired.name.clone(),
        ref_branch: desired.ref_branch.clone(),
        ref_commit_id: desired.ref_commit_id.clone(),
        ref_tag: desired.ref_tag.clone(),
        last_commit_id,
    }
}

fn parse_id(id: &str) -> Result<(&str, &str)> {
    Branch::parse_id(id)
        .ok_or_else(|| Error::invalid_input(format!("branch id '{id}' is not <repository_id>:<name>")))
}

fn normalized(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Ref source fields whose value differs between `current` and `desired`.
fn changed_ref_fields(current: &Branch, desired: &BranchSpec) -> Vec<&'static str> {
    [
        ("ref_branch", &current.ref_branch, &desired.ref_branch),
        ("ref_commit_id", &current.ref_commit_id, &desired.ref_commit_id),
        ("ref_tag", &current.ref_tag, &desired.ref_tag),
    ]
    .into_iter()
    .filter(|(_, old, new)| normalized(old) != normalized(new))
    .map(|(field, _, _)| field)
    .collect()
}

/// Turn a rejected ref update into an error.
fn rejection(result: RefUpdateResult, action: &str, branch: &str) -> Error {
    match result.update_status {
        RefUpdateStatus::StaleOldObjectId if action == "create" => {
            Error::conflict(format!("branch {branch} already exists"))
        }
        RefUpdateStatus::StaleOldObjectId => Error::conflict(format!(
            "branch {branch} changed concurrently; refresh and try again"
        )),
        RefUpdateStatus::InvalidRefName => {
            Error::invalid_input(format!("invalid branch name '{branch}'"))
        }
        status => Error::RefUpdateRejected {
            name: result.name,
            status,
            message: result.custom_message,
        },
    }
}

impl Reconciler for BranchReconciler {
    type Desired = BranchSpec;
    type Entity = Branch;
    type Error = Error;

    fn resource_type(&self) -> &'static str {
        "git_repository_branch"
    }

    fn create(&self, ctx: &OperationContext, desired: &BranchSpec) -> Result<Branch> {
        let commit_id = self.target(ctx, desired)?;

        let ref_name = heads_ref(&desired.name);
        let result = self.move_ref(
            ctx,
            &desired.repository_id,
            RefUpdate::create(&ref_name, &commit_id),
        )?;
        if !result.success {
            return Err(rejection(result, "create", &desired.name));
        }

        log::info!("Created branch {} at {}", desired.name, commit_id);
        Ok(entity(desired, commit_id))
    }

    fn read(&self, ctx: &OperationContext, id: &str) -> Result<Option<Branch>> {
        let (repository_id, name) = parse_id(id)?;
        let tip = match self.tip(ctx, repository_id, &heads_ref(name)) {
            Ok(tip) => tip,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        Ok(tip.map(|last_commit_id| Branch {
            id: id.to_string(),
            repository_id: repository_id.to_string(),
            name: name.to_string(),
            ref_branch: None,
            ref_commit_id: None,
            ref_tag: None,
            last_commit_id,
        }))
    }

    fn update(
        &self,
        ctx: &OperationContext,
        current: &Branch,
        desired: &BranchSpec,
    ) -> Result<UpdateOutcome<Branch>> {
        let mut identity = Vec::new();
        if desired.repository_id != current.repository_id {
            identity.push("repository_id");
        }
        if desired.name != current.name {
            identity.push("name");
        }
        if !identity.is_empty() {
            return Ok(UpdateOutcome::RequiresReplace { fields: identity });
        }

        let ref_name = heads_ref(&current.name);
        let changed = changed_ref_fields(current, desired);
        if changed.is_empty() {
            let tip = self
                .tip(ctx, &current.repository_id, &ref_name)?
                .ok_or_else(|| Error::not_found("branch", &current.id))?;
            return Ok(UpdateOutcome::Updated(entity(desired, tip)));
        }

        if self.strategy == RefUpdateStrategy::Replace {
            return Ok(UpdateOutcome::RequiresReplace { fields: changed });
        }

        let commit_id = self.resolve(ctx, desired)?;
        let tip = self
            .tip(ctx, &current.repository_id, &ref_name)?
            .ok_or_else(|| Error::not_found("branch", &current.id))?;
        if tip != commit_id {
            let result = self.move_ref(
                ctx,
                &current.repository_id,
                RefUpdate::repoint(&ref_name, &tip, &commit_id),
            )?;
            if !result.success {
                return Err(rejection(result, "update", &current.name));
            }
            log::info!("Moved branch {} from {} to {}", current.name, tip, commit_id);
        }

        Ok(UpdateOutcome::Updated(entity(desired, commit_id)))
    }

    fn preflight(&self, ctx: &OperationContext, desired: &BranchSpec) -> Result<()> {
        self.target(ctx, desired).map(|_| ())
    }

    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<()> {
        let (repository_id, name) = parse_id(id)?;
        let ref_name = heads_ref(name);

        let tip = match self.tip(ctx, repository_id, &ref_name) {
            Ok(Some(tip)) => tip,
            Ok(None) => {
                log::debug!("Branch {name} already absent");
                return Ok(());
            }
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        let result = match self.move_ref(ctx, repository_id, RefUpdate::delete(&ref_name, &tip)) {
            Ok(result) => result,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        if result.success {
            log::info!("Deleted branch {name}");
            return Ok(());
        }

        // A concurrent delete shows up as a stale old object id
        if result.update_status == RefUpdateStatus::StaleOldObjectId
            && self.tip(ctx, repository_id, &ref_name)?.is_none()
        {
            return Ok(());
        }
        Err(rejection(result, "delete", name))
    }
}
