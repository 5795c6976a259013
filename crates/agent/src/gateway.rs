//! Primary-to-secondary provider failover. One failover per send, no
//! backoff: the resolver owns the higher-level retry policy.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::llm::{ChatProvider, ChatRequest, LlmError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderRoute {
    PrimaryThenSecondary,
    /// The resolver's single retry path after an unusable primary reply.
    SecondaryOnly,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("both providers failed (secondary: {secondary})")]
    BothFailed {
        #[source]
        primary: LlmError,
        secondary: LlmError,
    },
    #[error("secondary provider failed")]
    SecondaryFailed(#[source] LlmError),
}

pub struct ProviderGateway {
    primary: Arc<dyn ChatProvider>,
    secondary: Arc<dyn ChatProvider>,
}

impl ProviderGateway {
    pub fn new(primary: Arc<dyn ChatProvider>, secondary: Arc<dyn ChatProvider>) -> Self {
        Self { primary, secondary }
    }

    pub async fn send(
        &self,
        request: &ChatRequest,
        route: ProviderRoute,
    ) -> Result<String, GatewayError> {
        let primary_error = match route {
            ProviderRoute::SecondaryOnly => None,
            ProviderRoute::PrimaryThenSecondary => {
                match self.primary.complete(request).await {
                    Ok(text) => return Ok(text),
                    Err(error) => {
                        warn!(
                            event_name = "gateway.primary_failed",
                            provider = self.primary.name(),
                            error = %error,
                            "primary provider failed, attempting secondary"
                        );
                        Some(error)
                    }
                }
            }
        };

        match self.secondary.complete(request).await {
            Ok(text) => Ok(text),
            Err(secondary) => {
                warn!(
                    event_name = "gateway.secondary_failed",
                    provider = self.secondary.name(),
                    error = %secondary,
                    "secondary provider failed"
                );
                Err(match primary_error {
                    Some(primary) => GatewayError::BothFailed { primary, secondary },
                    None => GatewayError::SecondaryFailed(secondary),
                })
            }
        }
    }
}
