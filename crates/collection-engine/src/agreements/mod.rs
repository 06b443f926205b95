//! Debt agreements: negotiated installment plans backed by a provider
//! charge, kept in sync through payment webhooks.

pub mod domain;
pub mod orchestrator;
pub mod repository;
pub mod router;
pub mod webhook;

#[cfg(test)]
mod tests;

pub use domain::{Agreement, AgreementId, AgreementStatus, AgreementTerms, StatusUpdate, TermsError};
pub use orchestrator::{AgreementError, AgreementOrchestrator, Negotiation, NegotiationRequest};
pub use repository::{AgreementRepository, MemoryWebhookLedger, WebhookLedger};
pub use router::agreement_router;
pub use webhook::{delivery_key, WebhookError, WebhookOutcome, WebhookService};
