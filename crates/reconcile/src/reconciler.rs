//! Reconciler trait for declarative remote entities
//!
//! A Reconciler maps the desired state of one resource type onto the
//! create/read/update/delete calls of a remote service.

use crate::context::{Interrupted, OperationContext};
use crate::types::UpdateOutcome;

/// An entity as the remote service reports it
pub trait Entity {
    /// Stable identity of the entity, used by later read/update/delete calls
    fn id(&self) -> &str;
}

/// Core trait for declarative resource types
///
/// Every resource type (project, repository, branch, ...) implements this
/// trait once. It provides:
/// - Creation from a desired state
/// - Reading back the current remote state by identity
/// - Updating towards a new desired state, or signalling replacement
/// - Idempotent deletion
///
/// # Example
///
/// ```ignore
/// use reconcile::{OperationContext, Reconciler};
///
/// fn show<R: Reconciler>(reconciler: &R, id: &str) -> Result<(), R::Error>
/// where
///     R::Entity: std::fmt::Debug,
/// {
///     let ctx = OperationContext::new();
///     match reconciler.read(&ctx, id)? {
///         Some(entity) => println!("{entity:?}"),
///         None => println!("{} {id} is gone", reconciler.resource_type()),
///     }
///     Ok(())
/// }
/// ```
pub trait Reconciler: Send + Sync {
    /// Caller-declared target configuration
    type Desired;

    /// Entity as reported by the remote service
    type Entity: Entity;

    /// Error type; must be able to carry an interruption
    type Error: From<Interrupted>;

    /// Resource type name (e.g. "git_repository_branch")
    fn resource_type(&self) -> &'static str;

    /// Create the entity described by `desired`
    ///
    /// Returns the entity with all computed attributes populated.
    fn create(
        &self,
        ctx: &OperationContext,
        desired: &Self::Desired,
    ) -> Result<Self::Entity, Self::Error>;

    /// Read the current state of an entity
    ///
    /// Returns `Ok(None)` when the entity no longer exists, so a host can
    /// detect external deletion.
    fn read(&self, ctx: &OperationContext, id: &str) -> Result<Option<Self::Entity>, Self::Error>;

    /// Move an existing entity towards `desired`
    ///
    /// `current` is the entity as the host last recorded it, including the
    /// inputs it was created from; changes are computed against it rather
    /// than against whatever the remote side has drifted to.
    ///
    /// Returns [`UpdateOutcome::RequiresReplace`] when an identifying field
    /// changed and the entity cannot be mutated in place.
    fn update(
        &self,
        ctx: &OperationContext,
        current: &Self::Entity,
        desired: &Self::Desired,
    ) -> Result<UpdateOutcome<Self::Entity>, Self::Error>;

    /// Reject a desired state before anything is changed
    ///
    /// [`apply_update`](crate::apply_update) calls this before destroying the
    /// entity being replaced, so cheap checks (input validation, lookups the
    /// create depends on) fail while the old entity is still in place.
    fn preflight(&self, _ctx: &OperationContext, _desired: &Self::Desired) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Delete an entity
    ///
    /// Deleting an entity that is already absent succeeds.
    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<(), Self::Error>;

    /// Check whether an entity exists
    fn exists(&self, ctx: &OperationContext, id: &str) -> Result<bool, Self::Error> {
        Ok(self.read(ctx, id)?.is_some())
    }
}
