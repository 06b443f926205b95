use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{Agreement, AgreementId, AgreementStatus, AgreementTerms, TermsError};
use super::repository::AgreementRepository;
use crate::collection::{
    Channel, Customer, DebtId, MessageContent, Messenger, RepositoryError, TenantId,
};
use crate::payments::{
    BillingType, CreateCustomerParams, CreatePaymentParams, PaymentError, PaymentProvider,
    ProviderCustomer, ProviderPayment, RetryPolicy,
};

/// Terms a debtor accepted, ready to be turned into a provider charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationRequest {
    pub tenant_id: TenantId,
    pub debt_id: DebtId,
    pub customer: Customer,
    pub original_amount: Decimal,
    pub agreed_amount: Decimal,
    pub installments: u32,
    #[serde(default = "default_billing_type")]
    pub billing_type: BillingType,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    /// Idempotency key on the provider side; defaults to `agreement-{debt}`.
    #[serde(default)]
    pub external_reference: Option<String>,
}

fn default_billing_type() -> BillingType {
    BillingType::Undefined
}

impl NegotiationRequest {
    pub fn external_reference(&self) -> String {
        self.external_reference
            .as_deref()
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("agreement-{}", self.debt_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Negotiation {
    pub agreement: Agreement,
    /// `true` when an agreement for this debt and charge already existed.
    pub reused: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AgreementError {
    #[error("invalid agreement terms: {0}")]
    Terms(#[from] TermsError),
    #[error("customer {0} has no document; the provider cannot register them")]
    MissingDocument(String),
    #[error(transparent)]
    Provider(#[from] PaymentError),
    #[error("agreement store failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// Turns negotiated terms into a provider charge and a persisted agreement.
pub struct AgreementOrchestrator {
    provider: Arc<dyn PaymentProvider>,
    agreements: Arc<dyn AgreementRepository>,
    messenger: Arc<dyn Messenger>,
    retry: RetryPolicy,
}

impl AgreementOrchestrator {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        agreements: Arc<dyn AgreementRepository>,
        messenger: Arc<dyn Messenger>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            agreements,
            messenger,
            retry,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn negotiate(
        &self,
        request: &NegotiationRequest,
    ) -> Result<Negotiation, AgreementError> {
        let terms = AgreementTerms::compute(
            request.original_amount,
            request.agreed_amount,
            request.installments,
        )?;
        if request.customer.document.is_empty() {
            return Err(AgreementError::MissingDocument(request.customer.id.to_string()));
        }

        let reference = request.external_reference();
        let provider_customer = self.provider_customer(&request.customer).await?;
        let payment = self
            .provider_payment(request, &terms, &provider_customer, &reference)
            .await?;

        if let Some(existing) = self
            .agreements
            .find_by_debt_and_payment(&request.debt_id, &payment.id)
            .await?
        {
            info!(
                debt = %request.debt_id,
                agreement = %existing.id.0,
                payment = %payment.id,
                "agreement already registered for this charge"
            );
            return Ok(Negotiation {
                agreement: existing,
                reused: true,
            });
        }

        let agreement = Agreement {
            id: AgreementId(format!("agr-{}", Uuid::new_v4())),
            tenant_id: request.tenant_id.clone(),
            debt_id: request.debt_id.clone(),
            customer_id: request.customer.id.clone(),
            original_amount: terms.original_amount,
            agreed_amount: terms.agreed_amount,
            installments: terms.installments,
            installment_amount: terms.installment_amount,
            discount_percentage: terms.discount_percentage,
            provider_name: self.provider.name().to_string(),
            provider_customer_id: provider_customer.id.clone(),
            provider_payment_id: payment.id.clone(),
            external_reference: reference,
            payment_status: payment.status,
            status: AgreementStatus::Active,
            payment_url: payment.payment_url.clone(),
            created_at: Utc::now(),
            payment_received_at: None,
        };
        let stored = self.agreements.upsert_by_external_reference(agreement).await?;
        info!(
            debt = %stored.debt_id,
            agreement = %stored.id.0,
            provider = %stored.provider_name,
            installments = stored.installments,
            "agreement registered"
        );

        self.notify(&request.customer, &stored, &payment).await;

        Ok(Negotiation {
            agreement: stored,
            reused: false,
        })
    }

    async fn provider_customer(
        &self,
        customer: &Customer,
    ) -> Result<ProviderCustomer, AgreementError> {
        let provider = self.provider.as_ref();
        let existing = self
            .retry
            .run("get_customer_by_document", move || {
                provider.get_customer_by_document(&customer.document)
            })
            .await?;
        if let Some(found) = existing {
            return Ok(found);
        }

        let params = CreateCustomerParams {
            name: customer.name.clone(),
            document: customer.document.clone(),
            email: customer.email().map(str::to_string),
            phone: customer.phone().map(str::to_string),
        };
        let params = &params;
        let created = self
            .retry
            .run("create_customer", move || provider.create_customer(params))
            .await?;
        info!(customer = %customer.id, provider_customer = %created.id, "provider customer created");
        Ok(created)
    }

    /// Every attempt looks the charge up by external reference first, so a
    /// create whose response was lost is never issued twice.
    async fn provider_payment(
        &self,
        request: &NegotiationRequest,
        terms: &AgreementTerms,
        customer: &ProviderCustomer,
        reference: &str,
    ) -> Result<ProviderPayment, AgreementError> {
        let split = terms.installments > 1;
        let params = CreatePaymentParams {
            customer_id: customer.id.clone(),
            billing_type: request.billing_type,
            value: if split {
                terms.installment_amount
            } else {
                terms.agreed_amount
            },
            due_date: request.due_date,
            description: Some(request.description.clone().unwrap_or_else(|| {
                format!("Debt agreement {} - {} installment(s)", request.debt_id, terms.installments)
            })),
            external_reference: Some(reference.to_string()),
            installment_count: split.then_some(terms.installments),
            installment_value: split.then_some(terms.installment_amount),
        };

        let provider = self.provider.as_ref();
        let params = &params;
        let payment = self
            .retry
            .run("create_payment", move || async move {
                match provider.get_payment_by_external_reference(reference).await {
                    Ok(Some(existing)) => Ok(existing),
                    Ok(None) => provider.create_payment(params).await,
                    Err(err) => Err(err),
                }
            })
            .await?;
        Ok(payment)
    }

    /// Delivery problems are logged; the agreement stands regardless.
    async fn notify(&self, customer: &Customer, agreement: &Agreement, payment: &ProviderPayment) {
        let content = agreement_content(customer, agreement, payment);
        let recipients = [
            (Channel::Email, customer.email()),
            (Channel::Sms, customer.phone()),
        ];

        for (channel, recipient) in recipients {
            let Some(recipient) = recipient else { continue };
            match self.messenger.send(channel, recipient, &content).await {
                Ok(receipt) if receipt.success => {}
                Ok(receipt) => warn!(
                    agreement = %agreement.id.0,
                    ?channel,
                    error = receipt.error.as_deref().unwrap_or("unknown"),
                    "agreement notification rejected"
                ),
                Err(err) => warn!(
                    agreement = %agreement.id.0,
                    ?channel,
                    error = %err,
                    "agreement notification failed"
                ),
            }
        }
    }
}

fn agreement_content(
    customer: &Customer,
    agreement: &Agreement,
    payment: &ProviderPayment,
) -> MessageContent {
    let mut body = format!(
        "Hello {}, your agreement for debt {} is confirmed: {} installment(s) of R$ {} (total R$ {}).",
        customer.name,
        agreement.debt_id,
        agreement.installments,
        agreement.installment_amount,
        agreement.agreed_amount,
    );
    if let Some(url) = &payment.payment_url {
        body.push_str(&format!(" Pay here: {url}"));
    }
    MessageContent {
        subject: Some(format!("Agreement confirmed - debt {}", agreement.debt_id)),
        body,
    }
}
