use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::collection::{
    ActionLogRepository, Channel, CollectionActionLog, CollectionEngine, CollectionPorts,
    CollectionSubject, CollectionTask, Customer, CustomerId, Debt, DebtId, DeliveryReceipt,
    Document, MemoryScoreCache, MessageContent, Messenger, MessagingError, RepositoryError,
    RuleOrigin, RuleRecord, RuleRepository, ScoreCache, ScoreReport, ScoringError,
    ScoringService, TaskRepository, TaskStatus, TenantId,
};
use crate::config::EngineConfig;

pub(super) const TENANT: &str = "tenant-acme";

pub(super) fn tenant() -> TenantId {
    TenantId(TENANT.to_string())
}

pub(super) fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn customer(id: &str, email: Option<&str>, phone: Option<&str>) -> Customer {
    Customer {
        id: CustomerId(id.to_string()),
        tenant_id: tenant(),
        name: format!("Customer {id}"),
        document: Document::new("123.456.789-09"),
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
    }
}

pub(super) fn debt(id: &str, customer: &str, days_overdue: u32, amount: i64) -> Debt {
    Debt {
        id: DebtId(id.to_string()),
        customer_id: CustomerId(customer.to_string()),
        amount: Decimal::from(amount),
        due_date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date"),
        days_overdue,
    }
}

pub(super) fn subject(debt_id: &str, customer: Customer) -> CollectionSubject {
    let debt = debt(debt_id, &customer.id.0, 45, 1_500);
    CollectionSubject {
        tenant_id: tenant(),
        customer,
        debt,
        history: None,
    }
}

pub(super) fn contactable_subject(debt_id: &str) -> CollectionSubject {
    subject(
        debt_id,
        customer("cus-1", Some("ana@example.com"), Some("+5511999990000")),
    )
}

pub(super) fn record(
    id: &str,
    rule_type: &str,
    customers: &[&str],
    range: (i32, i32),
    process_type: &str,
    priority: i32,
) -> RuleRecord {
    RuleRecord {
        id: id.to_string(),
        tenant_id: TENANT.to_string(),
        name: format!("rule {id}"),
        priority,
        rule_type: rule_type.to_string(),
        active_for_customers: customers.iter().map(|c| c.to_string()).collect(),
        min_score: range.0,
        max_score: range.1,
        process_type: process_type.to_string(),
        is_active: true,
        revision: 1,
        created_at: at(1),
    }
}

#[derive(Default)]
pub(super) struct MemoryRules {
    records: Mutex<Vec<RuleRecord>>,
}

impl MemoryRules {
    pub(super) fn with(records: Vec<RuleRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub(super) fn replace(&self, records: Vec<RuleRecord>) {
        *self.records.lock().unwrap() = records;
    }
}

#[async_trait]
impl RuleRepository for MemoryRules {
    async fn active_rules_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<RuleRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap();
        Ok(guard
            .iter()
            .filter(|record| record.tenant_id == tenant.0 && record.is_active)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRules;

#[async_trait]
impl RuleRepository for UnavailableRules {
    async fn active_rules_for_tenant(
        &self,
        _tenant: &TenantId,
    ) -> Result<Vec<RuleRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("rules table offline".into()))
    }
}

#[derive(Default)]
pub(super) struct MemoryTasks {
    tasks: Mutex<Vec<CollectionTask>>,
}

impl MemoryTasks {
    pub(super) fn all(&self) -> Vec<CollectionTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskRepository for MemoryTasks {
    async fn create(&self, task: CollectionTask) -> Result<CollectionTask, RepositoryError> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn blocking_task(
        &self,
        debt: &DebtId,
        origin: &RuleOrigin,
    ) -> Result<Option<CollectionTask>, RepositoryError> {
        let guard = self.tasks.lock().unwrap();
        Ok(guard
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

#[derive(Default)]
pub(super) struct MemoryLogs {
    entries: Mutex<Vec<CollectionActionLog>>,
}

impl MemoryLogs {
    pub(super) fn all(&self) -> Vec<CollectionActionLog> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionLogRepository for MemoryLogs {
    async fn append(&self, entry: CollectionActionLog) -> Result<(), RepositoryError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Scores keyed by normalized document; counts lookups.
#[derive(Default)]
pub(super) struct StaticScoring {
    scores: HashMap<String, ScoreReport>,
    calls: AtomicUsize,
}

impl StaticScoring {
    pub(super) fn with(document: &str, score: i32, class: &str) -> Self {
        let mut scoring = Self::default();
        scoring.scores.insert(
            Document::new(document).as_str().to_string(),
            ScoreReport {
                score,
                class: class.to_string(),
            },
        );
        scoring
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringService for StaticScoring {
    async fn recovery_score(&self, document: &Document) -> Result<ScoreReport, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores
            .get(document.as_str())
            .cloned()
            .ok_or_else(|| ScoringError::NotFound(document.to_string()))
    }
}

/// Records every send; channels in `failing` report a delivery failure.
#[derive(Default)]
pub(super) struct RecordingMessenger {
    sent: Mutex<Vec<(Channel, String, MessageContent)>>,
    failing: HashSet<Channel>,
}

impl RecordingMessenger {
    pub(super) fn failing(channels: &[Channel]) -> Self {
        Self {
            sent: Mutex::default(),
            failing: channels.iter().copied().collect(),
        }
    }

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
        if self.failing.contains(&channel) {
            return Err(MessagingError::Transport {
                channel,
                reason: "gateway timeout".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel, recipient.to_string(), content.clone()));
        Ok(DeliveryReceipt {
            success: true,
            message_id: Some(format!("msg-{}", recipient.len())),
            error: None,
        })
    }
}

pub(super) struct Harness {
    pub rules: Arc<MemoryRules>,
    pub tasks: Arc<MemoryTasks>,
    pub logs: Arc<MemoryLogs>,
    pub scoring: Arc<StaticScoring>,
    pub messenger: Arc<RecordingMessenger>,
    pub cache: Arc<MemoryScoreCache>,
}

impl Harness {
    pub(super) fn new(score: i32, records: Vec<RuleRecord>) -> Self {
        Self::with_messenger(score, records, RecordingMessenger::default())
    }

    pub(super) fn with_messenger(
        score: i32,
        records: Vec<RuleRecord>,
        messenger: RecordingMessenger,
    ) -> Self {
        Self {
            rules: Arc::new(MemoryRules::with(records)),
            tasks: Arc::new(MemoryTasks::default()),
            logs: Arc::new(MemoryLogs::default()),
            scoring: Arc::new(StaticScoring::with("12345678909", score, "?")),
            messenger: Arc::new(messenger),
            cache: Arc::new(MemoryScoreCache::default()),
        }
    }

    pub(super) fn ports(&self) -> CollectionPorts {
        CollectionPorts {
            rules: self.rules.clone(),
            tasks: self.tasks.clone(),
            logs: self.logs.clone(),
            scoring: self.scoring.clone(),
            messenger: self.messenger.clone(),
            cache: self.cache.clone() as Arc<dyn ScoreCache>,
        }
    }

    pub(super) fn engine(&self) -> CollectionEngine {
        let config = EngineConfig {
            concurrency: 2,
            score_cache_ttl: Duration::from_secs(60),
            ..EngineConfig::default()
        };
        CollectionEngine::new(&config, self.ports())
    }
}
