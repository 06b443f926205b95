type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure taxonomy shared by every payment provider adapter.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider \"{provider}\" is unavailable: {source}")]
    ProviderUnavailable {
        provider: String,
        #[source]
        source: BoxError,
    },
    #[error("payment not found: {0}")]
    PaymentNotFound(String),
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("{operation} is not implemented by the {provider} adapter")]
    NotImplemented {
        provider: String,
        operation: &'static str,
    },
    #[error("sandbox gateway cannot run in production mode; set CUSTOM_GATEWAY_MODE=test or use another provider")]
    ProductionBlocked,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{provider} rejected the request ({status}): {message}")]
    Gateway {
        provider: String,
        status: u16,
        message: String,
    },
}

impl PaymentError {
    pub fn unavailable(provider: &str, source: impl Into<BoxError>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.to_string(),
            source: source.into(),
        }
    }

    /// Only transport-level unavailability is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InvalidWebhook(_) => "INVALID_WEBHOOK",
            Self::NotImplemented { .. } => "NOT_IMPLEMENTED",
            Self::ProductionBlocked => "CUSTOM_GATEWAY_PRODUCTION_BLOCKED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Gateway { .. } => "GATEWAY_ERROR",
        }
    }
}
