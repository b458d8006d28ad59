//! Host-side helpers that drive a reconciler for a single resource
//!
//! These carry out replace semantics: when an update reports that an
//! identifying field changed, the old entity is destroyed before the new one
//! is created. [`Reconciler::preflight`] runs first; a create that fails for
//! any reason it does not check leaves the old entity deleted.

use crate::context::OperationContext;
use crate::reconciler::{Entity, Reconciler};
use crate::types::{Applied, UpdateOutcome};

/// Update an existing entity, replacing it if the reconciler requires it
pub fn apply_update<R>(
    reconciler: &R,
    ctx: &OperationContext,
    current: &R::Entity,
    desired: &R::Desired,
) -> Result<Applied<R::Entity>, R::Error>
where
    R: Reconciler + ?Sized,
{
    match reconciler.update(ctx, current, desired)? {
        UpdateOutcome::Updated(entity) => Ok(Applied::Updated(entity)),
        UpdateOutcome::RequiresReplace { fields } => {
            reconciler.preflight(ctx, desired)?;
            let previous_id = current.id().to_string();
            log::info!(
                "Replacing {} {} (changed: {})",
                reconciler.resource_type(),
                previous_id,
                fields.join(", ")
            );
            reconciler.delete(ctx, &previous_id)?;
            let entity = reconciler.create(ctx, desired)?;
            log::info!(
                "Replaced {} {} with {}",
                reconciler.resource_type(),
                previous_id,
                entity.id()
            );
            Ok(Applied::Replaced {
                previous_id,
                fields,
                entity,
            })
        }
    }
}

/// Converge one resource to `desired`
///
/// - No recorded entity: create
/// - Recorded entity that no longer exists remotely: create again
/// - Recorded entity that exists: [`apply_update`]
pub fn ensure<R>(
    reconciler: &R,
    ctx: &OperationContext,
    current: Option<&R::Entity>,
    desired: &R::Desired,
) -> Result<Applied<R::Entity>, R::Error>
where
    R: Reconciler + ?Sized,
{
    let Some(current) = current else {
        return reconciler.create(ctx, desired).map(Applied::Created);
    };

    if !reconciler.exists(ctx, current.id())? {
        log::warn!(
            "{} {} disappeared remotely, recreating",
            reconciler.resource_type(),
            current.id()
        );
        return reconciler.create(ctx, desired).map(Applied::Created);
    }

    apply_update(reconciler, ctx, current, desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Interrupted;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Label {
        name: String,
        color: String,
    }

    impl Entity for Label {
        fn id(&self) -> &str {
            &self.name
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum LabelError {
        Interrupted(Interrupted),
        Exists(String),
        Missing(String),
        NoColor(String),
    }

    impl From<Interrupted> for LabelError {
        fn from(err: Interrupted) -> Self {
            Self::Interrupted(err)
        }
    }

    #[derive(Default)]
    struct LabelStore {
        labels: Mutex<HashMap<String, String>>,
        deletes: Mutex<Vec<String>>,
    }

    impl Reconciler for LabelStore {
        type Desired = Label;
        type Entity = Label;
        type Error = LabelError;

        fn resource_type(&self) -> &'static str {
            "label"
        }

        fn create(&self, ctx: &OperationContext, desired: &Label) -> Result<Label, LabelError> {
            ctx.check()?;
            let mut labels = self.labels.lock().unwrap();
            if labels.contains_key(&desired.name) {
                return Err(LabelError::Exists(desired.name.clone()));
            }
            labels.insert(desired.name.clone(), desired.color.clone());
            Ok(desired.clone())
        }

        fn read(&self, ctx: &OperationContext, id: &str) -> Result<Option<Label>, LabelError> {
            ctx.check()?;
            Ok(self.labels.lock().unwrap().get(id).map(|color| Label {
                name: id.to_string(),
                color: color.clone(),
            }))
        }

        fn update(
            &self,
            ctx: &OperationContext,
            current: &Label,
            desired: &Label,
        ) -> Result<UpdateOutcome<Label>, LabelError> {
            ctx.check()?;
            let id = current.id();
            if desired.name != id {
                return Ok(UpdateOutcome::RequiresReplace {
                    fields: vec!["name"],
                });
            }
            let mut labels = self.labels.lock().unwrap();
            let color = labels
                .get_mut(id)
                .ok_or_else(|| LabelError::Missing(id.to_string()))?;
            *color = desired.color.clone();
            Ok(UpdateOutcome::Updated(desired.clone()))
        }

        fn preflight(&self, _ctx: &OperationContext, desired: &Label) -> Result<(), LabelError> {
            if desired.color.is_empty() {
                return Err(LabelError::NoColor(desired.name.clone()));
            }
            Ok(())
        }

        fn delete(&self, ctx: &OperationContext, id: &str) -> Result<(), LabelError> {
            ctx.check()?;
            self.deletes.lock().unwrap().push(id.to_string());
            self.labels.lock().unwrap().remove(id);
            Ok(())
        }
    }

    fn label(name: &str, color: &str) -> Label {
        Label {
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    #[test]
    fn test_apply_update_in_place() {
        let store = LabelStore::default();
        let ctx = OperationContext::new();
        let current = store.create(&ctx, &label("bug", "red")).unwrap();

        let applied = apply_update(&store, &ctx, &current, &label("bug", "orange")).unwrap();

        assert_eq!(applied, Applied::Updated(label("bug", "orange")));
        assert!(store.deletes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_apply_update_replaces_on_identity_change() {
        let store = LabelStore::default();
        let ctx = OperationContext::new();
        let current = store.create(&ctx, &label("bug", "red")).unwrap();

        let applied = apply_update(&store, &ctx, &current, &label("defect", "red")).unwrap();

        match applied {
            Applied::Replaced {
                previous_id,
                fields,
                entity,
            } => {
                assert_eq!(previous_id, "bug");
                assert_eq!(fields, vec!["name"]);
                assert_eq!(entity.id(), "defect");
            }
            other => panic!("Expected replacement, got {other:?}"),
        }
        assert!(store.read(&ctx, "bug").unwrap().is_none());
        assert!(store.exists(&ctx, "defect").unwrap());
    }

    #[test]
    fn test_replace_keeps_old_entity_when_preflight_fails() {
        let store = LabelStore::default();
        let ctx = OperationContext::new();
        let current = store.create(&ctx, &label("bug", "red")).unwrap();

        let result = apply_update(&store, &ctx, &current, &label("defect", ""));

        assert_eq!(result, Err(LabelError::NoColor("defect".to_string())));
        assert!(store.exists(&ctx, "bug").unwrap());
        assert!(store.deletes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_creates_without_identity() {
        let store = LabelStore::default();
        let ctx = OperationContext::new();

        let applied = ensure(&store, &ctx, None, &label("docs", "blue")).unwrap();

        assert_eq!(applied.action(), "created");
        assert!(store.exists(&ctx, "docs").unwrap());
    }

    #[test]
    fn test_ensure_recreates_after_external_delete() {
        let store = LabelStore::default();
        let ctx = OperationContext::new();
        let current = store.create(&ctx, &label("docs", "blue")).unwrap();
        store.labels.lock().unwrap().clear();

        let applied = ensure(&store, &ctx, Some(&current), &label("docs", "blue")).unwrap();

        assert_eq!(applied, Applied::Created(label("docs", "blue")));
    }

    #[test]
    fn test_ensure_updates_existing() {
        let store = LabelStore::default();
        let ctx = OperationContext::new();
        let current = store.create(&ctx, &label("docs", "blue")).unwrap();

        let applied = ensure(&store, &ctx, Some(&current), &label("docs", "green")).unwrap();

        assert_eq!(applied, Applied::Updated(label("docs", "green")));
    }

    #[test]
    fn test_cancelled_context_stops_before_any_change() {
        let store = LabelStore::default();
        let ctx = OperationContext::new();
        let current = store.create(&ctx, &label("bug", "red")).unwrap();

        ctx.token().cancel();
        let result = apply_update(&store, &ctx, &current, &label("defect", "red"));

        assert_eq!(result, Err(LabelError::Interrupted(Interrupted::Cancelled)));
        assert!(store.labels.lock().unwrap().contains_key("bug"));
    }
}
