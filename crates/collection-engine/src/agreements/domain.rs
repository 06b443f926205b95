use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::collection::{CustomerId, DebtId, TenantId};
use crate::payments::{PaymentStatus, WebhookEventKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgreementId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Draft,
    Active,
    Paid,
    Cancelled,
}

impl AgreementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AgreementStatus::Draft => "draft",
            AgreementStatus::Active => "active",
            AgreementStatus::Paid => "paid",
            AgreementStatus::Cancelled => "cancelled",
        }
    }
}

/// Negotiated installment plan linking a debt to a provider charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: AgreementId,
    pub tenant_id: TenantId,
    pub debt_id: DebtId,
    pub customer_id: CustomerId,
    pub original_amount: Decimal,
    pub agreed_amount: Decimal,
    pub installments: u32,
    pub installment_amount: Decimal,
    pub discount_percentage: Decimal,
    pub provider_name: String,
    pub provider_customer_id: String,
    pub provider_payment_id: String,
    pub external_reference: String,
    pub payment_status: PaymentStatus,
    pub status: AgreementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermsError {
    #[error("original amount is zero; discount percentage is undefined")]
    ZeroOriginalAmount,
    #[error("original amount {0} is negative")]
    NegativeOriginalAmount(Decimal),
    #[error("agreed amount must be positive, got {0}")]
    NonPositiveAgreedAmount(Decimal),
    #[error("an agreement needs at least one installment")]
    NoInstallments,
}

/// Money math of a negotiation. Amounts are rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgreementTerms {
    pub original_amount: Decimal,
    pub agreed_amount: Decimal,
    pub installments: u32,
    pub installment_amount: Decimal,
    pub discount_percentage: Decimal,
}

impl AgreementTerms {
    pub fn compute(
        original_amount: Decimal,
        agreed_amount: Decimal,
        installments: u32,
    ) -> Result<Self, TermsError> {
        if original_amount.is_zero() {
            return Err(TermsError::ZeroOriginalAmount);
        }
        if original_amount.is_sign_negative() {
            return Err(TermsError::NegativeOriginalAmount(original_amount));
        }
        if agreed_amount <= Decimal::ZERO {
            return Err(TermsError::NonPositiveAgreedAmount(agreed_amount));
        }
        if installments == 0 {
            return Err(TermsError::NoInstallments);
        }

        let installment_amount = (agreed_amount / Decimal::from(installments)).round_dp(2);
        let discount_percentage = ((original_amount - agreed_amount) / original_amount
            * Decimal::ONE_HUNDRED)
            .round_dp(2);

        Ok(Self {
            original_amount,
            agreed_amount,
            installments,
            installment_amount,
            discount_percentage,
        })
    }
}

/// Agreement fields a webhook event changes. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatusUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub status: Option<AgreementStatus>,
    pub payment_received_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    /// `None` for events that carry no state change.
    pub fn for_event(event: WebhookEventKind, now: DateTime<Utc>) -> Option<Self> {
        let update = match event {
            WebhookEventKind::Created => Self::payment(PaymentStatus::Pending),
            WebhookEventKind::Confirmed => Self::payment(PaymentStatus::Confirmed),
            WebhookEventKind::Received => Self {
                payment_status: Some(PaymentStatus::Received),
                status: Some(AgreementStatus::Paid),
                payment_received_at: Some(now),
            },
            WebhookEventKind::Overdue => Self::payment(PaymentStatus::Overdue),
            WebhookEventKind::Refunded => Self {
                status: Some(AgreementStatus::Cancelled),
                ..Self::payment(PaymentStatus::Refunded)
            },
            WebhookEventKind::Deleted => Self {
                status: Some(AgreementStatus::Cancelled),
                ..Self::payment(PaymentStatus::Deleted)
            },
            WebhookEventKind::Unknown => return None,
        };
        Some(update)
    }

    fn payment(status: PaymentStatus) -> Self {
        Self {
            payment_status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, agreement: &mut Agreement) {
        if let Some(payment_status) = self.payment_status {
            agreement.payment_status = payment_status;
        }
        if let Some(status) = self.status {
            agreement.status = status;
        }
        if let Some(received_at) = self.payment_received_at {
            agreement.payment_received_at = Some(received_at);
        }
    }
}
