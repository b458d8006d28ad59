//! # Reconcile
//!
//! A framework for reconciling declared desired state against remote entities.
//!
//! This crate provides the core abstractions a host uses to drive one
//! resource instance at a time: create it, read it back, update it, or
//! delete it, and surface the computed attributes of the result.
//!
//! ## Core Concepts
//!
//! - **Reconciler**: Per-resource-type component mapping desired state to remote calls
//! - **OperationContext**: Cancellation and deadline boundary for every operation
//! - **UpdateOutcome**: Either the updated entity or a signal that replacement is required
//! - **apply_update / ensure**: Host-side helpers that carry out replace semantics
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{Entity, OperationContext, Reconciler, UpdateOutcome, apply_update};
//!
//! #[derive(Debug, Clone)]
//! struct Note { id: String, body: String }
//!
//! impl Entity for Note {
//!     fn id(&self) -> &str { &self.id }
//! }
//!
//! struct NoteReconciler { client: NotesApi }
//!
//! impl Reconciler for NoteReconciler {
//!     type Desired = String;
//!     type Entity = Note;
//!     type Error = MyError;
//!
//!     fn resource_type(&self) -> &'static str { "note" }
//!     fn create(&self, ctx: &OperationContext, body: &String) -> Result<Note, MyError> {
//!         ctx.check()?;
//!         self.client.post_note(body)
//!     }
//!
//!     fn read(&self, ctx: &OperationContext, id: &str) -> Result<Option<Note>, MyError> {
//!         ctx.check()?;
//!         self.client.find_note(id)
//!     }
//!
//!     fn update(&self, ctx: &OperationContext, current: &Note, body: &String)
//!         -> Result<UpdateOutcome<Note>, MyError> {
//!         ctx.check()?;
//!         self.client.edit_note(&current.id, body).map(UpdateOutcome::Updated)
//!     }
//!
//!     fn delete(&self, ctx: &OperationContext, id: &str) -> Result<(), MyError> {
//!         ctx.check()?;
//!         self.client.remove_note(id)
//!     }
//! }
//!
//! let ctx = OperationContext::with_timeout(std::time::Duration::from_secs(30));
//! let applied = apply_update(&reconciler, &ctx, &note, &"new body".to_string())?;
//! ```
//!
//! ## Concurrency
//!
//! Reconcilers must be `Send + Sync`. A host may invoke operations for
//! distinct identities concurrently; it never runs two operations against the
//! same identity at once, so reconcilers do not lock per identity.

pub mod apply;
pub mod context;
pub mod reconciler;
pub mod types;

// Re-export main types at crate root
pub use apply::{apply_update, ensure};
pub use context::{CancellationToken, Interrupted, OperationContext};
pub use reconciler::{Entity, Reconciler};
pub use types::{Applied, UpdateOutcome};
