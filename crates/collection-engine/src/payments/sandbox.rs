use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::error::PaymentError;
use super::provider::{
    parse_webhook_envelope, BillingType, CreateCustomerParams, CreatePaymentParams,
    PaymentProvider, PaymentStatus, ProviderCustomer, ProviderPayment, RefundParams,
    WebhookEventKind, WebhookPayload,
};
use super::status::StatusMapper;
use crate::collection::Document;
use crate::config::GatewayMode;

const BASE_URL: &str = "https://test-gateway.local";

#[derive(Default)]
struct Ledger {
    customers: HashMap<String, ProviderCustomer>,
    customers_by_document: HashMap<Document, String>,
    payments: HashMap<String, ProviderPayment>,
    payments_by_reference: HashMap<String, String>,
}

/// In-process test-mode gateway. Every operation succeeds against an
/// in-memory ledger; refuses to start in production mode.
pub struct SandboxGateway {
    ledger: Mutex<Ledger>,
}

impl SandboxGateway {
    pub const NAME: &'static str = "sandbox";

    pub fn new(mode: GatewayMode) -> Result<Self, PaymentError> {
        if mode == GatewayMode::Production {
            return Err(PaymentError::ProductionBlocked);
        }
        Ok(Self {
            ledger: Mutex::new(Ledger::default()),
        })
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, PaymentError> {
        self.ledger
            .lock()
            .map_err(|_| PaymentError::unavailable(Self::NAME, "sandbox ledger poisoned"))
    }

    fn transition(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<ProviderPayment, PaymentError> {
        let mut ledger = self.ledger()?;
        let payment = ledger
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| PaymentError::PaymentNotFound(payment_id.to_string()))?;
        payment.status = status;
        payment.vendor_status = status.label().to_string();
        info!(payment = payment_id, status = status.label(), "sandbox payment transitioned");
        Ok(payment.clone())
    }

    pub fn simulate_confirmation(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        self.transition(payment_id, PaymentStatus::Confirmed)
    }

    pub fn simulate_receipt(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        self.transition(payment_id, PaymentStatus::Received)
    }

    pub fn simulate_overdue(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        self.transition(payment_id, PaymentStatus::Overdue)
    }

    /// Webhook body the sandbox would deliver for `event` on `payment_id`.
    pub fn webhook_body(
        &self,
        payment_id: &str,
        event: WebhookEventKind,
    ) -> Result<Vec<u8>, PaymentError> {
        let ledger = self.ledger()?;
        let payment = ledger
            .payments
            .get(payment_id)
            .ok_or_else(|| PaymentError::PaymentNotFound(payment_id.to_string()))?;
        let vendor_event = format!("PAYMENT_{}", event.label().to_ascii_uppercase());

        let body = json!({
            "id": format!("evt_{}", short_id()),
            "event": vendor_event,
            "payment": {
                "id": payment.id,
                "customer": payment.customer_id,
                "value": payment.value,
                "status": payment.vendor_status,
                "externalReference": payment.external_reference,
            },
        });
        Ok(body.to_string().into_bytes())
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[async_trait]
impl PaymentProvider for SandboxGateway {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn create_customer(
        &self,
        params: &CreateCustomerParams,
    ) -> Result<ProviderCustomer, PaymentError> {
        if params.document.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "customer document is required".to_string(),
            ));
        }

        let mut ledger = self.ledger()?;
        if let Some(existing) = ledger
            .customers_by_document
            .get(&params.document)
            .and_then(|id| ledger.customers.get(id))
        {
            return Ok(existing.clone());
        }

        let customer = ProviderCustomer {
            id: format!("test_cus_{}", short_id()),
            name: params.name.clone(),
            document: params.document.clone(),
            email: params.email.clone(),
            phone: params.phone.clone(),
        };
        ledger
            .customers_by_document
            .insert(customer.document.clone(), customer.id.clone());
        ledger
            .customers
            .insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn get_customer_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<ProviderCustomer>, PaymentError> {
        let ledger = self.ledger()?;
        Ok(ledger
            .customers_by_document
            .get(document)
            .and_then(|id| ledger.customers.get(id))
            .cloned())
    }

    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
    ) -> Result<ProviderPayment, PaymentError> {
        params.validate()?;

        let id = format!("test_pay_{}", short_id());
        let boleto_url = format!("{BASE_URL}/boleto/{id}");
        let pix_url = format!("{BASE_URL}/pix/{id}");
        let (boleto_url, pix_qr_code_url) = match params.billing_type {
            BillingType::Boleto => (Some(boleto_url), None),
            BillingType::Pix => (None, Some(pix_url)),
            BillingType::Undefined => (Some(boleto_url), Some(pix_url)),
            BillingType::CreditCard => (None, None),
        };

        let payment = ProviderPayment {
            payment_url: Some(format!("{BASE_URL}/pay/{id}")),
            id,
            customer_id: params.customer_id.clone(),
            billing_type: params.billing_type,
            value: params.value,
            due_date: params.due_date,
            status: PaymentStatus::Pending,
            vendor_status: PaymentStatus::Pending.label().to_string(),
            description: params.description.clone(),
            external_reference: params.external_reference.clone(),
            installment_count: params.installment_count,
            installment_value: params.installment_value,
            boleto_url,
            pix_qr_code_url,
        };

        let mut ledger = self.ledger()?;
        if let Some(reference) = &payment.external_reference {
            ledger
                .payments_by_reference
                .insert(reference.clone(), payment.id.clone());
        }
        ledger.payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        self.ledger()?
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::PaymentNotFound(payment_id.to_string()))
    }

    async fn get_payment_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ProviderPayment>, PaymentError> {
        let ledger = self.ledger()?;
        Ok(ledger
            .payments_by_reference
            .get(reference)
            .and_then(|id| ledger.payments.get(id))
            .cloned())
    }

    async fn refund_payment(&self, params: &RefundParams) -> Result<ProviderPayment, PaymentError> {
        self.transition(&params.payment_id, PaymentStatus::Refunded)
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<(), PaymentError> {
        self.transition(payment_id, PaymentStatus::Cancelled)
            .map(|_| ())
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookPayload, PaymentError> {
        parse_webhook_envelope(body, |event| StatusMapper::SANDBOX.to_internal_event(event))
    }
}
