use async_trait::async_trait;
use collection_engine::agreements::{Agreement, AgreementId, AgreementRepository, StatusUpdate};
use collection_engine::collection::{
    ActionLogRepository, Channel, CollectionActionLog, CollectionTask, DebtId, DeliveryReceipt,
    Document, MessageContent, Messenger, MessagingError, RepositoryError, RuleOrigin,
    RuleRecord, RuleRepository, ScoreReport, ScoringError, ScoringService, TaskRepository,
    TaskStatus, TenantId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".into()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRuleRepository {
    records: Arc<Mutex<Vec<RuleRecord>>>,
}

impl InMemoryRuleRepository {
    pub(crate) fn with_records(records: Vec<RuleRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn active_rules_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<RuleRecord>, RepositoryError> {
        Ok(lock(&self.records)?
            .iter()
            .filter(|record| record.tenant_id == tenant.0 && record.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTaskRepository {
    tasks: Arc<Mutex<Vec<CollectionTask>>>,
}

impl InMemoryTaskRepository {
    pub(crate) fn tasks(&self) -> Vec<CollectionTask> {
        lock(&self.tasks).map(|tasks| tasks.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: CollectionTask) -> Result<CollectionTask, RepositoryError> {
        let mut guard = lock(&self.tasks)?;
        if guard.iter().any(|existing| existing.id == task.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(task.clone());
        Ok(task)
    }

    async fn blocking_task(
        &self,
        debt: &DebtId,
        origin: &RuleOrigin,
    ) -> Result<Option<CollectionTask>, RepositoryError> {
        Ok(lock(&self.tasks)?
            .iter()
            .rev()
            .find(|task| {
                task.debt_id == *debt
                    && task.origin == *origin
                    && task.auto_dispatch_blocked
                    && matches!(task.status, TaskStatus::Pending | TaskStatus::InProgress)
            })
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryActionLog {
    entries: Arc<Mutex<Vec<CollectionActionLog>>>,
}

impl InMemoryActionLog {
    pub(crate) fn entries(&self) -> Vec<CollectionActionLog> {
        lock(&self.entries)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ActionLogRepository for InMemoryActionLog {
    async fn append(&self, entry: CollectionActionLog) -> Result<(), RepositoryError> {
        lock(&self.entries)?.push(entry);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAgreementRepository {
    agreements: Arc<Mutex<HashMap<AgreementId, Agreement>>>,
}

impl InMemoryAgreementRepository {
    fn find(
        &self,
        predicate: impl Fn(&Agreement) -> bool,
    ) -> Result<Option<Agreement>, RepositoryError> {
        Ok(lock(&self.agreements)?
            .values()
            .find(|agreement| predicate(agreement))
            .cloned())
    }
}

#[async_trait]
impl AgreementRepository for InMemoryAgreementRepository {
    async fn find_by_debt_and_payment(
        &self,
        debt: &DebtId,
        provider_payment_id: &str,
    ) -> Result<Option<Agreement>, RepositoryError> {
        self.find(|agreement| {
            agreement.debt_id == *debt && agreement.provider_payment_id == provider_payment_id
        })
    }

    async fn find_by_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<Agreement>, RepositoryError> {
        self.find(|agreement| agreement.provider_payment_id == provider_payment_id)
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Agreement>, RepositoryError> {
        self.find(|agreement| agreement.external_reference == reference)
    }

    async fn upsert_by_external_reference(
        &self,
        agreement: Agreement,
    ) -> Result<Agreement, RepositoryError> {
        let mut guard = lock(&self.agreements)?;
        guard.retain(|_, existing| existing.external_reference != agreement.external_reference);
        guard.insert(agreement.id.clone(), agreement.clone());
        Ok(agreement)
    }

    async fn update_status(
        &self,
        id: &AgreementId,
        update: &StatusUpdate,
    ) -> Result<Agreement, RepositoryError> {
        let mut guard = lock(&self.agreements)?;
        let agreement = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        update.apply(agreement);
        Ok(agreement.clone())
    }
}

/// Local stand-in for the recovery bureau: derives a stable score in
/// `0..=1000` from the document digits.
#[derive(Default, Clone, Copy)]
pub(crate) struct DigestScoring;

#[async_trait]
impl ScoringService for DigestScoring {
    async fn recovery_score(&self, document: &Document) -> Result<ScoreReport, ScoringError> {
        if document.is_empty() {
            return Err(ScoringError::NotFound(document.to_string()));
        }
        let digest = document
            .as_str()
            .bytes()
            .fold(17u32, |acc, digit| acc.wrapping_mul(31).wrapping_add(u32::from(digit - b'0')));
        Ok(ScoreReport {
            score: (digest % 1001) as i32,
            class: String::new(),
        })
    }
}

/// Messenger that only logs; keeps an outbox for the demo.
#[derive(Default, Clone)]
pub(crate) struct LoggingMessenger {
    outbox: Arc<Mutex<Vec<(Channel, String, MessageContent)>>>,
}

impl LoggingMessenger {
    pub(crate) fn outbox(&self) -> Vec<(Channel, String, MessageContent)> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Messenger for LoggingMessenger {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        content: &MessageContent,
    ) -> Result<DeliveryReceipt, MessagingError> {
        info!(?channel, recipient, subject = ?content.subject, "outbound message");
        let mut outbox = self.outbox.lock().map_err(|_| MessagingError::Transport {
            channel,
            reason: "outbox poisoned".into(),
        })?;
        outbox.push((channel, recipient.to_string(), content.clone()));
        Ok(DeliveryReceipt {
            success: true,
            message_id: Some(format!("local-{}", outbox.len())),
            error: None,
        })
    }
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|err| format!("failed to parse '{raw}' as an amount ({err})"))
}
