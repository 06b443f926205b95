use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::PaymentError;
use crate::collection::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Boleto,
    CreditCard,
    Pix,
    Undefined,
}

/// Canonical payment status shared by every gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Received,
    Overdue,
    Refunded,
    Cancelled,
    Deleted,
    Unknown,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 8] = [
        PaymentStatus::Pending,
        PaymentStatus::Confirmed,
        PaymentStatus::Received,
        PaymentStatus::Overdue,
        PaymentStatus::Refunded,
        PaymentStatus::Cancelled,
        PaymentStatus::Deleted,
        PaymentStatus::Unknown,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Received => "received",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Deleted => "deleted",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

/// Canonical webhook event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventKind {
    Created,
    Confirmed,
    Received,
    Overdue,
    Refunded,
    Deleted,
    Unknown,
}

impl WebhookEventKind {
    pub const ALL: [WebhookEventKind; 7] = [
        WebhookEventKind::Created,
        WebhookEventKind::Confirmed,
        WebhookEventKind::Received,
        WebhookEventKind::Overdue,
        WebhookEventKind::Refunded,
        WebhookEventKind::Deleted,
        WebhookEventKind::Unknown,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            WebhookEventKind::Created => "created",
            WebhookEventKind::Confirmed => "confirmed",
            WebhookEventKind::Received => "received",
            WebhookEventKind::Overdue => "overdue",
            WebhookEventKind::Refunded => "refunded",
            WebhookEventKind::Deleted => "deleted",
            WebhookEventKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCustomer {
    pub id: String,
    pub name: String,
    pub document: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPayment {
    pub id: String,
    pub customer_id: String,
    pub billing_type: BillingType,
    pub value: Decimal,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    /// Status string exactly as the vendor reported it.
    pub vendor_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boleto_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pix_qr_code_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerParams {
    pub name: String,
    pub document: Document,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentParams {
    pub customer_id: String,
    pub billing_type: BillingType,
    pub value: Decimal,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub installment_count: Option<u32>,
    #[serde(default)]
    pub installment_value: Option<Decimal>,
}

impl CreatePaymentParams {
    /// An installment plan (`installment_count > 1`) must carry
    /// `installment_value`, and the charge `value` is its first installment.
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.customer_id.trim().is_empty() {
            return Err(PaymentError::InvalidRequest(
                "customer id is required".to_string(),
            ));
        }
        if self.value <= Decimal::ZERO {
            return Err(PaymentError::InvalidRequest(format!(
                "payment value must be positive, got {}",
                self.value
            )));
        }

        match self.installment_count {
            Some(0) => Err(PaymentError::InvalidRequest(
                "installment count must be at least 1".to_string(),
            )),
            Some(count) if count > 1 => match self.installment_value {
                None => Err(PaymentError::InvalidRequest(format!(
                    "installment value is required for {count} installments"
                ))),
                Some(installment) if installment != self.value => {
                    Err(PaymentError::InvalidRequest(format!(
                        "first installment {} does not match installment value {installment}",
                        self.value
                    )))
                }
                Some(_) => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundParams {
    pub payment_id: String,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Minimal gateway-agnostic webhook shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    /// Vendor delivery id, when the gateway sends one.
    pub event_id: Option<String>,
    pub event: WebhookEventKind,
    pub raw_event: String,
    pub payment: WebhookPayment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayment {
    pub id: String,
    pub customer: Option<String>,
    pub value: Option<Decimal>,
    pub status: String,
    pub external_reference: Option<String>,
}

/// Contract every payment gateway integration implements.
///
/// Adapters hold no mutable state visible to callers; every call is
/// independent and safe to issue concurrently.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Callers check [`PaymentProvider::get_customer_by_document`] first.
    async fn create_customer(
        &self,
        params: &CreateCustomerParams,
    ) -> Result<ProviderCustomer, PaymentError>;

    async fn get_customer_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<ProviderCustomer>, PaymentError>;

    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
    ) -> Result<ProviderPayment, PaymentError>;

    /// Fails with [`PaymentError::PaymentNotFound`] when the vendor has no
    /// record of `payment_id`.
    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError>;

    async fn get_payment_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ProviderPayment>, PaymentError>;

    async fn refund_payment(&self, params: &RefundParams) -> Result<ProviderPayment, PaymentError>;

    async fn cancel_payment(&self, payment_id: &str) -> Result<(), PaymentError>;

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookPayload, PaymentError>;
}

#[derive(Deserialize)]
struct RawWebhook {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    payment: Option<RawWebhookPayment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWebhookPayment {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    value: Option<Decimal>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
}

/// Parses the `{ id?, event, payment: { id, ... } }` envelope both supported
/// gateways emit, mapping the vendor event through `map_event`.
pub(crate) fn parse_webhook_envelope(
    body: &[u8],
    map_event: impl Fn(&str) -> WebhookEventKind,
) -> Result<WebhookPayload, PaymentError> {
    let raw: RawWebhook = serde_json::from_slice(body)
        .map_err(|err| PaymentError::InvalidWebhook(format!("body is not valid JSON: {err}")))?;

    let raw_event = raw
        .event
        .map(|event| event.trim().to_string())
        .filter(|event| !event.is_empty())
        .ok_or_else(|| PaymentError::InvalidWebhook("missing event".to_string()))?;

    let payment = raw
        .payment
        .ok_or_else(|| PaymentError::InvalidWebhook("missing payment".to_string()))?;
    let payment_id = payment
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PaymentError::InvalidWebhook("missing payment.id".to_string()))?;

    Ok(WebhookPayload {
        event_id: raw.id.filter(|id| !id.trim().is_empty()),
        event: map_event(&raw_event),
        raw_event,
        payment: WebhookPayment {
            id: payment_id,
            customer: payment.customer,
            value: payment.value,
            status: payment.status.unwrap_or_default(),
            external_reference: payment.external_reference,
        },
    })
}
