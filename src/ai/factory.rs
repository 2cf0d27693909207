#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use tracing::{info, warn};

use super::{
    error::FactoryError,
    provider::{AnthropicClient, GeminiClient, OpenAiClient, ProviderClient, ProviderKind},
};
use crate::config::Config;

/// Builds the ordered list of usable provider clients from configuration.
///
/// The result preserves the configured fallback order exactly, filtered to
/// providers with a credential. An unknown provider name in the order is a
/// fatal configuration error, as is an order that yields zero usable clients;
/// both are caught here, before any network call is made.
pub fn build_clients(config: &Config) -> Result<Vec<Arc<dyn ProviderClient>>, FactoryError> {
    let http = config.http_client();
    let mut clients: Vec<Arc<dyn ProviderClient>> = Vec::new();

    for (position, name) in config.provider_order().iter().enumerate() {
        let Some(kind) = ProviderKind::parse(name) else {
            return Err(FactoryError::UnknownProvider(name.clone()));
        };

        let descriptor = config.provider_descriptor(kind, position);
        if !descriptor.has_credential() {
            warn!(provider = %kind, "Skipping provider: no API key configured");
            continue;
        }

        let credential = descriptor
            .credential
            .clone()
            .unwrap_or_default();
        let model = descriptor.model.clone();

        let client: Arc<dyn ProviderClient> = match kind {
            ProviderKind::Gemini => Arc::new(GeminiClient::new(model, credential, http.clone())),
            ProviderKind::Anthropic => {
                Arc::new(AnthropicClient::new(model, credential, http.clone()))
            }
            ProviderKind::OpenAi => Arc::new(OpenAiClient::new(model, credential)),
        };

        info!(provider = %kind, model = client.model(), "Configured AI provider");
        clients.push(client);
    }

    if clients.is_empty() {
        return Err(FactoryError::NoProvidersConfigured);
    }

    Ok(clients)
}
