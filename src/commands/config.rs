use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Path => {
            println!("{}", config::config_path()?.display());
            Ok(())
        }
        ConfigCommand::Show => show(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let path = config::config_path()?;
    let resolved = super::provider_config(ctx)?;

    let report = serde_json::json!({
        "config_file": path.display().to_string(),
        "config_file_exists": path.exists(),
        "organization_url": resolved.organization_url(),
        "organization": resolved.organization_name(),
        "api_version": resolved.api_version,
        "request_timeout_secs": resolved.request_timeout.as_secs(),
        "update_strategy": resolved.update_strategy.as_str(),
        "retry_max_attempts": resolved.retry.max_attempts,
    });

    super::emit(ctx, &report, |_| {
        ui::header("Configuration");
        let exists = if path.exists() { "" } else { " (not found)" };
        ui::kv("config file", &format!("{}{exists}", path.display()));
        ui::kv("organization url", resolved.organization_url());
        ui::kv_opt("organization", resolved.organization_name());
        ui::kv("personal access token", "<redacted>");
        ui::kv("api version", &resolved.api_version);
        ui::kv("request timeout", &format!("{}s", resolved.request_timeout.as_secs()));
        ui::kv("update strategy", resolved.update_strategy.as_str());
        ui::kv("retry attempts", &resolved.retry.max_attempts.to_string());
    })
}
