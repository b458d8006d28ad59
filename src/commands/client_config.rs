use anyhow::{Context as _, Result};

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let client = super::client(ctx)?;
    let op = super::operation(ctx);

    let info = client
        .read_client_config(&op)
        .context("Failed to read organization details")?;

    super::emit(ctx, &info, |c| {
        ui::header(&c.name);
        ui::kv("organization url", &c.organization_url);
        ui::kv("organization id", &c.organization_id);
        ui::kv("owner id", &c.owner_id);
        ui::kv("status", &c.status);
        ui::kv("tenant id", &c.tenant_id);
    })
}
