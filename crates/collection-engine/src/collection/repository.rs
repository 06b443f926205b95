use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{
    CollectionActionLog, CollectionTask, Customer, DebtId, Document, RuleOrigin, TenantId,
};
use super::rules::RuleRecord;

/// Read access to the persisted rule table.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn active_rules_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<RuleRecord>, RepositoryError>;
}

/// Storage for operator tasks. Tasks are never mutated by the engine after
/// creation.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: CollectionTask) -> Result<CollectionTask, RepositoryError>;

    /// Most recent open task for the debt that blocks automatic dispatch and
    /// was opened under `origin`, if any.
    async fn blocking_task(
        &self,
        debt: &DebtId,
        origin: &RuleOrigin,
    ) -> Result<Option<CollectionTask>, RepositoryError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait ActionLogRepository: Send + Sync {
    async fn append(&self, entry: CollectionActionLog) -> Result<(), RepositoryError>;
}

/// One source of customer records searchable by document.
#[async_trait]
pub trait CustomerSource: Send + Sync {
    fn name(&self) -> &str;

    async fn find_by_document(
        &self,
        tenant: &TenantId,
        document: &Document,
    ) -> Result<Option<Customer>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Bureau response for a document. `class` is the raw bureau label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: i32,
    pub class: String,
}

#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn recovery_score(&self, document: &Document) -> Result<ScoreReport, ScoringError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("no recovery score available for document {0}")]
    NotFound(String),
    #[error("scoring service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Whatsapp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outbound email/SMS/WhatsApp senders.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        content: &MessageContent,
    ) -> Result<DeliveryReceipt, MessagingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("{channel:?} transport unavailable: {reason}")]
    Transport { channel: Channel, reason: String },
}
