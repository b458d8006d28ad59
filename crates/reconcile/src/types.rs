//! Core types for reconciliation outcomes

/// Result of asking a reconciler to update an existing entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome<E> {
    /// The entity was changed in place (or needed no change)
    Updated(E),
    /// An identifying field changed; the host must destroy and recreate
    RequiresReplace {
        /// Names of the fields that force replacement
        fields: Vec<&'static str>,
    },
}

impl<E> UpdateOutcome<E> {
    /// Check if the outcome signals replacement
    pub fn requires_replace(&self) -> bool {
        matches!(self, Self::RequiresReplace { .. })
    }

    /// The updated entity, if the update happened in place
    pub fn into_entity(self) -> Option<E> {
        match self {
            Self::Updated(entity) => Some(entity),
            Self::RequiresReplace { .. } => None,
        }
    }
}

/// What the host-side helpers did to converge one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<E> {
    /// No prior entity existed; a new one was created
    Created(E),
    /// The existing entity was updated in place
    Updated(E),
    /// The existing entity was destroyed and a new one created
    Replaced {
        /// Identity of the destroyed entity
        previous_id: String,
        /// Fields that forced replacement
        fields: Vec<&'static str>,
        /// The newly created entity
        entity: E,
    },
}

impl<E> Applied<E> {
    /// The resulting entity
    pub fn entity(&self) -> &E {
        match self {
            Self::Created(entity) | Self::Updated(entity) => entity,
            Self::Replaced { entity, .. } => entity,
        }
    }

    /// Consume and return the resulting entity
    pub fn into_entity(self) -> E {
        match self {
            Self::Created(entity) | Self::Updated(entity) => entity,
            Self::Replaced { entity, .. } => entity,
        }
    }

    /// Short verb describing the action, for display
    pub fn action(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Replaced { .. } => "replaced",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_outcome_helpers() {
        let updated = UpdateOutcome::Updated(7);
        assert!(!updated.requires_replace());
        assert_eq!(updated.into_entity(), Some(7));

        let replace: UpdateOutcome<i32> = UpdateOutcome::RequiresReplace {
            fields: vec!["name"],
        };
        assert!(replace.requires_replace());
        assert_eq!(replace.into_entity(), None);
    }

    #[test]
    fn test_applied_entity_access() {
        let replaced = Applied::Replaced {
            previous_id: "old".to_string(),
            fields: vec!["name"],
            entity: "new",
        };
        assert_eq!(*replaced.entity(), "new");
        assert_eq!(replaced.action(), "replaced");
        assert_eq!(replaced.into_entity(), "new");

        assert_eq!(Applied::Created(1).action(), "created");
        assert_eq!(Applied::Updated(1).action(), "updated");
    }
}
