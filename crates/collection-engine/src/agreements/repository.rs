use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;

use super::domain::{Agreement, AgreementId, StatusUpdate};
use crate::collection::{DebtId, RepositoryError};

#[async_trait]
pub trait AgreementRepository: Send + Sync {
    async fn find_by_debt_and_payment(
        &self,
        debt: &DebtId,
        provider_payment_id: &str,
    ) -> Result<Option<Agreement>, RepositoryError>;

    async fn find_by_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<Agreement>, RepositoryError>;

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Agreement>, RepositoryError>;

    /// Inserts, or replaces the agreement already stored under the same
    /// external reference. Returns the stored row.
    async fn upsert_by_external_reference(
        &self,
        agreement: Agreement,
    ) -> Result<Agreement, RepositoryError>;

    async fn update_status(
        &self,
        id: &AgreementId,
        update: &StatusUpdate,
    ) -> Result<Agreement, RepositoryError>;
}

/// Records which webhook deliveries were already applied.
#[async_trait]
pub trait WebhookLedger: Send + Sync {
    /// `true` when `key` was not seen before and is now claimed.
    async fn claim(&self, key: &str) -> Result<bool, RepositoryError>;

    /// Forgets a claim so a redelivery is processed again.
    async fn release(&self, key: &str) -> Result<(), RepositoryError>;
}

const LEDGER_CAPACITY: u64 = 100_000;
const LEDGER_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Process-local ledger. Keys expire after a week, well past any vendor
/// redelivery window.
pub struct MemoryWebhookLedger {
    keys: Cache<String, ()>,
}

impl Default for MemoryWebhookLedger {
    fn default() -> Self {
        Self::with_retention(LEDGER_RETENTION)
    }
}

impl MemoryWebhookLedger {
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            keys: Cache::builder()
                .max_capacity(LEDGER_CAPACITY)
                .time_to_live(retention)
                .build(),
        }
    }
}

#[async_trait]
impl WebhookLedger for MemoryWebhookLedger {
    async fn claim(&self, key: &str) -> Result<bool, RepositoryError> {
        Ok(self.keys.entry(key.to_string()).or_insert(()).is_fresh())
    }

    async fn release(&self, key: &str) -> Result<(), RepositoryError> {
        self.keys.invalidate(key);
        Ok(())
    }
}
