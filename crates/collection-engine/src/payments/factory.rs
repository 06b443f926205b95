use std::sync::Arc;

use tracing::info;

use super::asaas::AsaasAdapter;
use super::error::PaymentError;
use super::provider::PaymentProvider;
use super::sandbox::SandboxGateway;
use crate::config::{PaymentConfig, ProviderKind};

/// Builds the configured gateway adapter.
pub fn provider_from_config(config: &PaymentConfig) -> Result<Arc<dyn PaymentProvider>, PaymentError> {
    let provider: Arc<dyn PaymentProvider> = match config.provider {
        ProviderKind::Asaas => {
            if config.asaas.api_key.is_none() {
                info!("ASAAS_API_KEY not set; asaas calls will report the provider as unavailable");
            }
            Arc::new(AsaasAdapter::new(&config.asaas)?)
        }
        ProviderKind::Sandbox => Arc::new(SandboxGateway::new(config.gateway_mode)?),
    };
    info!(provider = provider.name(), "payment provider selected");
    Ok(provider)
}
