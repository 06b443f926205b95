use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::agreements::{
    Agreement, AgreementId, AgreementOrchestrator, AgreementRepository, MemoryWebhookLedger,
    NegotiationRequest, StatusUpdate, WebhookService,
};
use crate::collection::{
    Channel, Customer, CustomerId, DebtId, DeliveryReceipt, Document, MessageContent, Messenger,
    MessagingError, RepositoryError, TenantId,
};
use crate::config::GatewayMode;
use crate::payments::{
    BillingType, CreateCustomerParams, CreatePaymentParams, PaymentError, PaymentProvider,
    ProviderCustomer, ProviderPayment, RefundParams, RetryPolicy, SandboxGateway, WebhookPayload,
};

pub(super) fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

pub(super) fn customer() -> Customer {
    Customer {
        id: CustomerId("cus-1".to_string()),
        tenant_id: TenantId("tenant-acme".to_string()),
        name: "Ana Souza".to_string(),
        document: Document::new("123.456.789-09"),
        email: Some("ana@example.com".to_string()),
        phone: Some("+5511999990000".to_string()),
    }
}

pub(super) fn request(debt: &str, original: &str, agreed: &str, installments: u32) -> NegotiationRequest {
    NegotiationRequest {
        tenant_id: TenantId("tenant-acme".to_string()),
        debt_id: DebtId(debt.to_string()),
        customer: customer(),
        original_amount: dec(original),
        agreed_amount: dec(agreed),
        installments,
        billing_type: BillingType::Pix,
        due_date: NaiveDate::from_ymd_opt(2025, 4, 10).expect("valid date"),
        description: None,
        external_reference: None,
    }
}

#[derive(Default)]
pub(super) struct MemoryAgreements {
    rows: Mutex<Vec<Agreement>>,
    updates: AtomicUsize,
    fail_updates: AtomicBool,
}

impl MemoryAgreements {
    pub(super) fn all(&self) -> Vec<Agreement> {
        self.rows.lock().unwrap().clone()
    }

    pub(super) fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub(super) fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    fn find(&self, predicate: impl Fn(&Agreement) -> bool) -> Option<Agreement> {
        self.rows.lock().unwrap().iter().find(|row| predicate(row)).cloned()
    }
}

#[async_trait]
impl AgreementRepository for MemoryAgreements {
    async fn find_by_debt_and_payment(
        &self,
        debt: &DebtId,
        provider_payment_id: &str,
    ) -> Result<Option<Agreement>, RepositoryError> {
        Ok(self.find(|row| row.debt_id == *debt && row.provider_payment_id == provider_payment_id))
    }

    async fn find_by_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<Agreement>, RepositoryError> {
        Ok(self.find(|row| row.provider_payment_id == provider_payment_id))
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Agreement>, RepositoryError> {
        Ok(self.find(|row| row.external_reference == reference))
    }

    async fn upsert_by_external_reference(
        &self,
        agreement: Agreement,
    ) -> Result<Agreement, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|row| row.external_reference != agreement.external_reference);
        rows.push(agreement.clone());
        Ok(agreement)
    }

    async fn update_status(
        &self,
        id: &AgreementId,
        update: &StatusUpdate,
    ) -> Result<Agreement, RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("agreements table offline".into()));
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        update.apply(row);
        Ok(row.clone())
    }
}

#[derive(Default)]
pub(super) struct RecordingMessenger {
    sent: Mutex<Vec<(Channel, String, MessageContent)>>,
}

impl RecordingMessenger {
    pub(super) fn sent(&self) -> Vec<(Channel, String, MessageContent)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        content: &MessageContent,
    ) -> Result<DeliveryReceipt, MessagingError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel, recipient.to_string(), content.clone()));
        Ok(DeliveryReceipt {
            success: true,
            message_id: None,
            error: None,
        })
    }
}

/// Sandbox wrapper that counts charges and can drop the response of the
/// next `lost_responses` creates after the charge was registered.
pub(super) struct FlakyGateway {
    pub inner: SandboxGateway,
    creates: AtomicUsize,
    lost_responses: AtomicUsize,
}

impl FlakyGateway {
    pub(super) fn new() -> Self {
        Self {
            inner: SandboxGateway::new(GatewayMode::Test).expect("test mode"),
            creates: AtomicUsize::new(0),
            lost_responses: AtomicUsize::new(0),
        }
    }

    pub(super) fn losing(responses: usize) -> Self {
        let gateway = Self::new();
        gateway.lost_responses.store(responses, Ordering::SeqCst);
        gateway
    }

    pub(super) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for FlakyGateway {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_customer(
        &self,
        params: &CreateCustomerParams,
    ) -> Result<ProviderCustomer, PaymentError> {
        self.inner.create_customer(params).await
    }

    async fn get_customer_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<ProviderCustomer>, PaymentError> {
        self.inner.get_customer_by_document(document).await
    }

    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
    ) -> Result<ProviderPayment, PaymentError> {
        let payment = self.inner.create_payment(params).await?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let lost = self
            .lost_responses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if lost {
            return Err(PaymentError::unavailable("sandbox", "connection reset"));
        }
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        self.inner.get_payment(payment_id).await
    }

    async fn get_payment_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ProviderPayment>, PaymentError> {
        self.inner.get_payment_by_external_reference(reference).await
    }

    async fn refund_payment(&self, params: &RefundParams) -> Result<ProviderPayment, PaymentError> {
        self.inner.refund_payment(params).await
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<(), PaymentError> {
        self.inner.cancel_payment(payment_id).await
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookPayload, PaymentError> {
        self.inner.parse_webhook(body)
    }
}

pub(super) struct Harness {
    pub gateway: Arc<FlakyGateway>,
    pub agreements: Arc<MemoryAgreements>,
    pub messenger: Arc<RecordingMessenger>,
    pub ledger: Arc<MemoryWebhookLedger>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_gateway(FlakyGateway::new())
    }

    pub(super) fn with_gateway(gateway: FlakyGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            agreements: Arc::new(MemoryAgreements::default()),
            messenger: Arc::new(RecordingMessenger::default()),
            ledger: Arc::new(MemoryWebhookLedger::default()),
        }
    }

    pub(super) fn orchestrator(&self) -> AgreementOrchestrator {
        AgreementOrchestrator::new(
            self.gateway.clone(),
            self.agreements.clone(),
            self.messenger.clone(),
            RetryPolicy::new(3, Duration::from_millis(1)),
        )
    }

    pub(super) fn webhooks(&self) -> WebhookService {
        WebhookService::new(
            self.gateway.clone(),
            self.agreements.clone(),
            self.ledger.clone(),
        )
    }
}
