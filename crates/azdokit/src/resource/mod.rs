//! Reconcilers for Azure DevOps resource types.
//!
//! Each type implements [`reconcile::Reconciler`] once:
//!
//! | Resource                | Reconciler               | Identity                   |
//! |-------------------------|--------------------------|----------------------------|
//! | `project`               | [`ProjectReconciler`]    | project id                 |
//! | `git_repository`        | [`RepositoryReconciler`] | repository id              |
//! | `git_repository_branch` | [`BranchReconciler`]     | `<repository_id>:<name>`   |

pub mod branch;
pub mod project;
pub mod repository;

pub use branch::BranchReconciler;
pub use project::ProjectReconciler;
pub use repository::RepositoryReconciler;
