pub mod branch;
pub mod client_config;
pub mod config;
pub mod project;
pub mod repository;

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::time::Duration;

use azdokit::{Client, ProviderConfig};
use reconcile::{Applied, OperationContext};

use crate::Context;
use crate::config::{EnvValues, FileConfig, Overrides};
use crate::ui;

/// Resolve the provider config from file, environment and flags
pub fn provider_config(ctx: &Context) -> Result<ProviderConfig> {
    let file = FileConfig::load()?;
    let overrides = Overrides {
        org_service_url: ctx.org_url.clone(),
        update_strategy: ctx.update_strategy,
    };
    crate::config::resolve(&file, EnvValues::read(), overrides)
}

/// Build a client for the configured organization
pub fn client(ctx: &Context) -> Result<Client> {
    let config = provider_config(ctx)?;
    log::debug!("Using {config:?}");
    Client::new(config).context("Failed to create Azure DevOps client")
}

/// Operation context bounded by `--timeout`
pub fn operation(ctx: &Context) -> OperationContext {
    match ctx.timeout {
        Some(secs) => OperationContext::with_timeout(Duration::from_secs(secs)),
        None => OperationContext::new(),
    }
}

/// Ask before a destructive action unless `yes` was given
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// Print `value` as JSON, or run `human` for terminal output
pub fn emit<T: Serialize>(ctx: &Context, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

/// JSON shape of an [`Applied`] result
#[derive(Serialize)]
pub struct AppliedReport<'a, E> {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_fields: Option<&'a [&'static str]>,
    pub resource: &'a E,
}

impl<'a, E> AppliedReport<'a, E> {
    pub fn new(applied: &'a Applied<E>) -> Self {
        let (previous_id, replaced_fields) = match applied {
            Applied::Replaced {
                previous_id,
                fields,
                ..
            } => (Some(previous_id.as_str()), Some(fields.as_slice())),
            _ => (None, None),
        };
        Self {
            action: applied.action(),
            previous_id,
            replaced_fields,
            resource: applied.entity(),
        }
    }
}

/// Print the outcome of an update, then the resulting entity
pub fn report_applied<E: Serialize>(
    ctx: &Context,
    kind: &str,
    applied: &Applied<E>,
    show: impl FnOnce(&E),
) -> Result<()> {
    emit(ctx, &AppliedReport::new(applied), |report| {
        match applied {
            Applied::Replaced {
                previous_id,
                fields,
                ..
            } => ui::success(&format!(
                "Replaced {kind} {previous_id} (changed: {})",
                fields.join(", ")
            )),
            _ => ui::success(&format!("{} {kind}", capitalize(report.action))),
        }
        show(report.resource);
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("updated"), "Updated");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_applied_report_json() {
        let updated = Applied::Updated("entity");
        let json = serde_json::to_value(AppliedReport::new(&updated)).unwrap();
        assert_eq!(json["action"], "updated");
        assert!(json.get("previous_id").is_none());
        assert!(json.get("replaced_fields").is_none());

        let replaced = Applied::Replaced {
            previous_id: "old".to_string(),
            fields: vec!["name"],
            entity: "entity",
        };
        let json = serde_json::to_value(AppliedReport::new(&replaced)).unwrap();
        assert_eq!(json["action"], "replaced");
        assert_eq!(json["previous_id"], "old");
        assert_eq!(json["replaced_fields"][0], "name");
        assert_eq!(json["resource"], "entity");
    }

    #[test]
    fn test_operation_without_timeout_has_no_deadline() {
        let ctx = Context::default();
        assert!(operation(&ctx).deadline().is_none());

        let ctx = Context {
            timeout: Some(5),
            ..Context::default()
        };
        assert!(operation(&ctx).deadline().is_some());
    }
}
