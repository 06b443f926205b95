//! Collection decision engine: risk classification, rule resolution and
//! action dispatch for overdue debts.

pub mod cache;
pub mod classification;
pub mod directory;
pub mod dispatcher;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod rules;
pub mod thresholds;

#[cfg(test)]
mod tests;

pub use cache::{MemoryScoreCache, NoScoreCache, ScoreCache};
pub use classification::{
    recommended_action, ClassificationCriteria, ClassificationRule, ClassificationStats,
    CustomerHistory, PaymentBehavior, Predicate, RiskAssessment, RiskClassifier, RiskTier,
};
pub use directory::FallbackCustomerDirectory;
pub use dispatcher::{ActionDispatcher, DispatchError, DispatchOutcome};
pub use domain::{
    ActionStatus, ActionType, CollectionActionLog, CollectionRule, CollectionSubject,
    CollectionTask, Customer, CustomerId, Debt, DebtId, Document, DocumentKind, ProcessType,
    RecoveryClass, RecoveryScore, RuleId, RuleOrigin, RuleScope, TaskId, TaskStatus, TaskType,
    TenantId,
};
pub use engine::{
    BatchFailure, BatchReport, CollectionEngine, CollectionPorts, EngineError, Evaluation,
};
pub use repository::{
    ActionLogRepository, Channel, CustomerSource, DeliveryReceipt, MessageContent, Messenger,
    MessagingError, RepositoryError, RuleRepository, ScoreReport, ScoringError, ScoringService,
    TaskRepository,
};
pub use resolver::{Resolution, RuleResolver, RuleSource, BUILTIN_RULE_ID};
pub use router::collection_router;
pub use rules::{RuleRecord, RuleTable, RuleValidationError};
pub use thresholds::{RecoveryThresholds, AUTOMATIC_SCORE_THRESHOLD};
