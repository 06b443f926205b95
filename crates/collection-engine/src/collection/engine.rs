use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cache::ScoreCache;
use super::classification::{
    recommended_action, ClassificationCriteria, RiskAssessment, RiskClassifier,
};
use super::dispatcher::{ActionDispatcher, DispatchError, DispatchOutcome};
use super::domain::{CollectionSubject, DebtId, RecoveryClass, RecoveryScore};
use super::repository::{
    ActionLogRepository, Messenger, RepositoryError, RuleRepository, ScoringError,
    ScoringService, TaskRepository,
};
use super::resolver::{Resolution, RuleResolver};
use super::rules::{RuleTable, RuleValidationError};
use crate::config::EngineConfig;

/// External collaborators the engine reads from and writes to.
#[derive(Clone)]
pub struct CollectionPorts {
    pub rules: Arc<dyn RuleRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub logs: Arc<dyn ActionLogRepository>,
    pub scoring: Arc<dyn ScoringService>,
    pub messenger: Arc<dyn Messenger>,
    pub cache: Arc<dyn ScoreCache>,
}

/// Full trace of one debt evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub debt_id: DebtId,
    pub recovery: RecoveryScore,
    pub risk: RiskAssessment,
    pub recommended_action: &'static str,
    pub resolution: Resolution,
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub debt_id: DebtId,
    pub error: String,
}

/// Batch result in submission order. Skipped debts were not started because
/// the batch was cancelled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub evaluated: Vec<Evaluation>,
    pub failures: Vec<BatchFailure>,
    pub skipped: Vec<DebtId>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.evaluated.len() + self.failures.len() + self.skipped.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("recovery score lookup failed: {0}")]
    Scoring(#[from] ScoringError),
    #[error("rule table unavailable: {0}")]
    Rules(#[from] RepositoryError),
    #[error("rule table rejected: {0}")]
    InvalidRules(#[from] RuleValidationError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("evaluation cancelled")]
    Cancelled,
}

/// Drives score lookup, classification, rule resolution and dispatch.
pub struct CollectionEngine {
    classifier: RiskClassifier,
    resolver: RuleResolver,
    dispatcher: ActionDispatcher,
    rules: Arc<dyn RuleRepository>,
    scoring: Arc<dyn ScoringService>,
    cache: Arc<dyn ScoreCache>,
    score_ttl: Duration,
    concurrency: usize,
}

impl CollectionEngine {
    pub fn new(config: &EngineConfig, ports: CollectionPorts) -> Self {
        Self::with_classifier(config, ports, RiskClassifier::default())
    }

    pub fn with_classifier(
        config: &EngineConfig,
        ports: CollectionPorts,
        classifier: RiskClassifier,
    ) -> Self {
        Self {
            classifier,
            resolver: RuleResolver::new(config.thresholds.clone()),
            dispatcher: ActionDispatcher::new(ports.tasks, ports.logs, ports.messenger),
            rules: ports.rules,
            scoring: ports.scoring,
            cache: ports.cache,
            score_ttl: config.score_cache_ttl,
            concurrency: config.concurrency.max(1),
        }
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    pub fn classify(&self, criteria: &ClassificationCriteria) -> RiskAssessment {
        self.classifier.classify(criteria)
    }

    /// Evaluate one debt end to end.
    pub async fn evaluate(&self, subject: &CollectionSubject) -> Result<Evaluation, EngineError> {
        let recovery = self.recovery_score(subject).await?;

        let criteria = ClassificationCriteria {
            days_overdue: subject.debt.days_overdue,
            amount: subject.debt.amount,
            history: subject.history.clone(),
        };
        let risk = self.classifier.classify(&criteria);

        let records = self
            .rules
            .active_rules_for_tenant(&subject.tenant_id)
            .await?;
        let table = RuleTable::from_records(&subject.tenant_id, records).map_err(|err| {
            error!(tenant = %subject.tenant_id.0, error = %err, "tenant rule table failed validation");
            err
        })?;

        let resolution = self.resolver.resolve(
            &table,
            &subject.tenant_id,
            &subject.customer.id,
            recovery.score,
        );
        info!(
            debt = %subject.debt.id,
            score = recovery.score,
            rule = %resolution.rule.id,
            source = ?resolution.source,
            process = resolution.process_type().label(),
            "collection rule selected"
        );

        let outcome = self
            .dispatcher
            .dispatch(subject, &resolution, recovery.score)
            .await?;

        Ok(Evaluation {
            debt_id: subject.debt.id.clone(),
            recommended_action: recommended_action(risk.tier, subject.debt.days_overdue),
            recovery,
            risk,
            resolution,
            outcome,
        })
    }

    /// Evaluate a batch with at most `concurrency` debts in flight. The token
    /// is checked before each debt starts; debts already in flight finish.
    pub async fn run_batch(
        &self,
        subjects: Vec<CollectionSubject>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut results: Vec<(usize, DebtId, Result<Evaluation, EngineError>)> =
            stream::iter(subjects.into_iter().enumerate())
                .map(|(index, subject)| async move {
                    let debt_id = subject.debt.id.clone();
                    if cancel.is_cancelled() {
                        return (index, debt_id, Err(EngineError::Cancelled));
                    }
                    let result = self.evaluate(&subject).await;
                    (index, debt_id, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        results.sort_by_key(|(index, _, _)| *index);

        let mut report = BatchReport::default();
        for (_, debt_id, result) in results {
            match result {
                Ok(evaluation) => report.evaluated.push(evaluation),
                Err(EngineError::Cancelled) => report.skipped.push(debt_id),
                Err(err) => {
                    warn!(debt = %debt_id, error = %err, "debt evaluation failed");
                    report.failures.push(BatchFailure {
                        debt_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            evaluated = report.evaluated.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "collection batch finished"
        );
        report
    }

    async fn recovery_score(
        &self,
        subject: &CollectionSubject,
    ) -> Result<RecoveryScore, EngineError> {
        let document = &subject.customer.document;
        if document.is_empty() {
            warn!(
                debt = %subject.debt.id,
                customer = %subject.customer.id,
                "customer has no document on file, evaluating as unscored"
            );
            return Ok(RecoveryScore {
                document: document.clone(),
                score: 0,
                class: self.resolver.thresholds().class_for(0),
            });
        }

        if let Some(cached) = self.cache.get(document) {
            debug!(debt = %subject.debt.id, "recovery score served from cache");
            return Ok(cached);
        }

        let report = self.scoring.recovery_score(document).await?;
        let class = RecoveryClass::parse(&report.class)
            .unwrap_or_else(|| self.resolver.thresholds().class_for(report.score));
        let score = RecoveryScore {
            document: document.clone(),
            score: report.score,
            class,
        };
        self.cache.set(score.clone(), self.score_ttl);
        Ok(score)
    }
}
