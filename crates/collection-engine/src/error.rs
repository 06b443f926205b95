use crate::agreements::AgreementError;
use crate::config::ConfigError;
use crate::payments::PaymentError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Payment(PaymentError),
    Agreement(AgreementError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Payment(err) => write!(f, "payment provider error: {}", err),
            AppError::Agreement(err) => write!(f, "agreement error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Payment(err) => Some(err),
            AppError::Agreement(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Payment(err) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Payment(PaymentError::PaymentNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Payment(
                PaymentError::InvalidWebhook(_) | PaymentError::InvalidRequest(_),
            ) => StatusCode::BAD_REQUEST,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::Agreement(
                AgreementError::Terms(_)
                | AgreementError::MissingDocument(_)
                | AgreementError::Provider(PaymentError::InvalidRequest(_)),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Agreement(AgreementError::Provider(err)) if err.is_retryable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Agreement(AgreementError::Provider(_)) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Agreement(AgreementError::Repository(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<PaymentError> for AppError {
    fn from(value: PaymentError) -> Self {
        Self::Payment(value)
    }
}

impl From<AgreementError> for AppError {
    fn from(value: AgreementError) -> Self {
        Self::Agreement(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreements::TermsError;

    #[test]
    fn payment_errors_map_to_gateway_statuses() {
        let cases = [
            (
                PaymentError::unavailable("asaas", "connection reset"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PaymentError::PaymentNotFound("pay_1".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PaymentError::InvalidWebhook("missing event".into()),
                StatusCode::BAD_REQUEST,
            ),
            (PaymentError::ProductionBlocked, StatusCode::BAD_GATEWAY),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn agreement_errors_follow_their_cause() {
        let terms = AppError::from(AgreementError::Terms(TermsError::ZeroOriginalAmount));
        assert_eq!(terms.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let provider = AppError::from(AgreementError::Provider(PaymentError::unavailable(
            "sandbox", "down",
        )));
        assert_eq!(provider.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn config_errors_are_internal() {
        let response = AppError::from(ConfigError::InvalidPort).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
