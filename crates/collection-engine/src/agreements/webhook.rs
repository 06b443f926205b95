use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{Agreement, AgreementStatus, StatusUpdate};
use super::repository::{AgreementRepository, WebhookLedger};
use crate::collection::RepositoryError;
use crate::payments::{PaymentError, PaymentProvider, PaymentStatus, WebhookPayload};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied {
        agreement_id: String,
        payment_status: PaymentStatus,
        status: AgreementStatus,
    },
    /// Delivery key already processed.
    Duplicate,
    /// No agreement references the payment.
    UnknownPayment { payment_id: String },
    /// Event carries no state change.
    Ignored { event: String },
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied { .. } => "applied",
            WebhookOutcome::Duplicate => "duplicate",
            WebhookOutcome::UnknownPayment { .. } => "unknown_payment",
            WebhookOutcome::Ignored { .. } => "ignored",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Malformed(#[from] PaymentError),
    #[error("webhook ledger failed: {0}")]
    Ledger(RepositoryError),
    #[error("agreement store failed: {0}")]
    Store(RepositoryError),
}

/// Applies provider notifications to agreements, at most once per delivery.
pub struct WebhookService {
    provider: Arc<dyn PaymentProvider>,
    agreements: Arc<dyn AgreementRepository>,
    ledger: Arc<dyn WebhookLedger>,
}

impl WebhookService {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        agreements: Arc<dyn AgreementRepository>,
        ledger: Arc<dyn WebhookLedger>,
    ) -> Self {
        Self {
            provider,
            agreements,
            ledger,
        }
    }

    pub async fn handle(&self, body: &[u8]) -> Result<WebhookOutcome, WebhookError> {
        let payload = self.provider.parse_webhook(body)?;
        let payment_id = payload.payment.id.clone();

        let Some(update) = StatusUpdate::for_event(payload.event, Utc::now()) else {
            info!(event = %payload.raw_event, payment = %payment_id, "webhook event carries no status change");
            return Ok(WebhookOutcome::Ignored {
                event: payload.raw_event,
            });
        };

        let key = delivery_key(&payload);
        if !self.ledger.claim(&key).await.map_err(WebhookError::Ledger)? {
            info!(key = %key, payment = %payment_id, "duplicate webhook delivery skipped");
            return Ok(WebhookOutcome::Duplicate);
        }

        match self.apply(&payload, &update).await {
            Ok(Some(agreement)) => {
                info!(
                    agreement = %agreement.id.0,
                    payment = %payment_id,
                    event = %payload.raw_event,
                    payment_status = agreement.payment_status.label(),
                    status = agreement.status.label(),
                    "agreement updated from webhook"
                );
                Ok(WebhookOutcome::Applied {
                    agreement_id: agreement.id.0,
                    payment_status: agreement.payment_status,
                    status: agreement.status,
                })
            }
            Ok(None) => {
                warn!(payment = %payment_id, event = %payload.raw_event, "webhook for a payment with no agreement");
                // The agreement may not be stored yet; a redelivery gets another chance.
                self.release(&key).await;
                Ok(WebhookOutcome::UnknownPayment { payment_id })
            }
            Err(err) => {
                error!(payment = %payment_id, error = %err, "failed to apply webhook");
                self.release(&key).await;
                Err(WebhookError::Store(err))
            }
        }
    }

    async fn apply(
        &self,
        payload: &WebhookPayload,
        update: &StatusUpdate,
    ) -> Result<Option<Agreement>, RepositoryError> {
        let Some(agreement) = self.locate(payload).await? else {
            return Ok(None);
        };
        self.agreements
            .update_status(&agreement.id, update)
            .await
            .map(Some)
    }

    /// Provider payment id first, then the external reference the charge
    /// was created with.
    async fn locate(&self, payload: &WebhookPayload) -> Result<Option<Agreement>, RepositoryError> {
        if let Some(found) = self.agreements.find_by_payment_id(&payload.payment.id).await? {
            return Ok(Some(found));
        }
        match payload.payment.external_reference.as_deref() {
            Some(reference) if !reference.trim().is_empty() => {
                self.agreements.find_by_external_reference(reference.trim()).await
            }
            _ => Ok(None),
        }
    }

    async fn release(&self, key: &str) {
        if let Err(err) = self.ledger.release(key).await {
            warn!(key, error = %err, "failed to release webhook claim");
        }
    }
}

/// Vendor event id when present, otherwise event, payment and status.
pub fn delivery_key(payload: &WebhookPayload) -> String {
    match payload.event_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!(
            "{}:{}:{}",
            payload.raw_event, payload.payment.id, payload.payment.status
        ),
    }
}
