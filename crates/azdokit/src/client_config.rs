//! Client configuration data source.
//!
//! Reports which organization the client is connected to, combining the
//! organization metadata from the service with the configured URL.

use crate::error::Result;
use crate::remote::Remote;
use crate::types::ClientConfig;
use reconcile::OperationContext;

/// Data source for `client_config`.
#[derive(Clone)]
pub struct ClientConfigSource {
    remote: Remote,
    organization_url: String,
}

impl ClientConfigSource {
    pub(crate) fn new(remote: Remote, organization_url: impl Into<String>) -> Self {
        Self {
            remote,
            organization_url: organization_url.into(),
        }
    }

    /// Read the client configuration.
    pub fn read(&self, ctx: &OperationContext) -> Result<ClientConfig> {
        let organization = self
            .remote
            .read(ctx, "read organization", |b| b.organization())?;

        Ok(ClientConfig {
            id: organization.id.clone(),
            name: organization.name,
            organization_id: organization.id,
            organization_url: self.organization_url.clone(),
            owner_id: organization.owner_id,
            status: organization.status,
            tenant_id: organization.tenant_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::types::RetryConfig;
    use std::sync::Arc;

    #[test]
    fn test_reports_configured_url() {
        let remote = Remote::new(Arc::new(MockBackend::new()), RetryConfig::no_retry());
        let source = ClientConfigSource::new(remote, "https://dev.azure.com/contoso");

        let config = source.read(&OperationContext::new()).unwrap();

        assert_eq!(config.organization_url, "https://dev.azure.com/contoso");
        assert_eq!(config.id, config.organization_id);
        assert!(!config.name.is_empty());
        assert!(!config.status.is_empty());
        assert!(!config.tenant_id.is_empty());
    }
}
