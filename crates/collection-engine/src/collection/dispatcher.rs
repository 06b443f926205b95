use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    ActionStatus, ActionType, CollectionActionLog, CollectionSubject, CollectionTask, ProcessType,
    RuleOrigin, TaskId, TaskStatus, TaskType,
};
use super::repository::{
    ActionLogRepository, Channel, MessageContent, Messenger, RepositoryError, TaskRepository,
};
use super::resolver::Resolution;

/// Terminal result of one dispatch. Every evaluation produces a fresh outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    MessageSent {
        channels: Vec<Channel>,
    },
    /// Every channel failed; an assisted follow-up task was opened.
    MessageFailed {
        reason: String,
        follow_up: CollectionTask,
    },
    TaskOpened {
        task: CollectionTask,
    },
    /// Automatic rule, but no email or phone on file.
    Degraded {
        task: CollectionTask,
    },
    /// A manual task opened under the same rule revision still blocks dispatch.
    Blocked {
        blocking_task: TaskId,
    },
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::MessageSent { .. } => "message_sent",
            DispatchOutcome::MessageFailed { .. } => "message_failed",
            DispatchOutcome::TaskOpened { .. } => "task_opened",
            DispatchOutcome::Degraded { .. } => "degraded_to_manual",
            DispatchOutcome::Blocked { .. } => "blocked",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unable to open collection task: {0}")]
    Task(#[source] RepositoryError),
    #[error("unable to check dispatch block: {0}")]
    BlockLookup(#[source] RepositoryError),
}

/// Executes the action prescribed by a resolved rule.
pub struct ActionDispatcher {
    tasks: Arc<dyn TaskRepository>,
    logs: Arc<dyn ActionLogRepository>,
    messenger: Arc<dyn Messenger>,
}

impl ActionDispatcher {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        logs: Arc<dyn ActionLogRepository>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            tasks,
            logs,
            messenger,
        }
    }

    pub async fn dispatch(
        &self,
        subject: &CollectionSubject,
        resolution: &Resolution,
        score: i32,
    ) -> Result<DispatchOutcome, DispatchError> {
        match resolution.process_type() {
            ProcessType::Automatic => self.automatic(subject, resolution).await,
            ProcessType::Assisted => {
                let description = format!(
                    "Assisted collection under rule '{}' (score {score})",
                    resolution.rule.name
                );
                let task = self
                    .open_task(subject, resolution, TaskType::Assisted, false, description)
                    .await?;
                Ok(DispatchOutcome::TaskOpened { task })
            }
            ProcessType::Manual => {
                let description = format!(
                    "Manual collection under rule '{}' (score {score}); automatic dispatch blocked",
                    resolution.rule.name
                );
                let task = self
                    .open_task(subject, resolution, TaskType::Manual, true, description)
                    .await?;
                Ok(DispatchOutcome::TaskOpened { task })
            }
        }
    }

    async fn automatic(
        &self,
        subject: &CollectionSubject,
        resolution: &Resolution,
    ) -> Result<DispatchOutcome, DispatchError> {
        let debt_id = &subject.debt.id;
        let origin = origin_of(resolution);

        if let Some(task) = self
            .tasks
            .blocking_task(debt_id, &origin)
            .await
            .map_err(DispatchError::BlockLookup)?
        {
            info!(debt = %debt_id, task = %task.id.0, "automatic dispatch blocked by manual task");
            self.record(
                subject,
                ActionType::AutoMessage,
                ActionStatus::Blocked,
                Some(format!("blocked by task {}", task.id.0)),
            )
            .await;
            return Ok(DispatchOutcome::Blocked {
                blocking_task: task.id,
            });
        }

        let email = subject.customer.email();
        let phone = subject.customer.phone();
        if email.is_none() && phone.is_none() {
            warn!(debt = %debt_id, customer = %subject.customer.id, "no contact channel on file, degrading to manual");
            let task = self
                .open_task(
                    subject,
                    resolution,
                    TaskType::Manual,
                    true,
                    "Automatic rule matched but no email or phone is on file".to_string(),
                )
                .await?;
            return Ok(DispatchOutcome::Degraded { task });
        }

        let content = reminder_content(subject);
        let mut delivered = Vec::new();
        let mut failures = Vec::new();

        let targets = [(Channel::Email, email), (Channel::Sms, phone)];
        for (channel, recipient) in targets {
            let Some(recipient) = recipient else {
                continue;
            };
            match self.messenger.send(channel, recipient, &content).await {
                Ok(receipt) if receipt.success => delivered.push(channel),
                Ok(receipt) => failures.push(format!(
                    "{channel:?}: {}",
                    receipt.error.unwrap_or_else(|| "rejected".to_string())
                )),
                Err(err) => failures.push(err.to_string()),
            }
        }

        if !delivered.is_empty() {
            info!(debt = %debt_id, channels = ?delivered, "automatic reminder sent");
            let detail = (!failures.is_empty()).then(|| failures.join("; "));
            self.record(subject, ActionType::AutoMessage, ActionStatus::Sent, detail)
                .await;
            return Ok(DispatchOutcome::MessageSent {
                channels: delivered,
            });
        }

        let reason = failures.join("; ");
        warn!(debt = %debt_id, %reason, "automatic reminder failed on every channel");
        self.record(
            subject,
            ActionType::AutoMessage,
            ActionStatus::Failed,
            Some(reason.clone()),
        )
        .await;

        let follow_up = self
            .open_task(
                subject,
                resolution,
                TaskType::Assisted,
                false,
                format!("Automatic reminder failed ({reason}); contact the customer"),
            )
            .await?;

        Ok(DispatchOutcome::MessageFailed { reason, follow_up })
    }

    async fn open_task(
        &self,
        subject: &CollectionSubject,
        resolution: &Resolution,
        task_type: TaskType,
        auto_dispatch_blocked: bool,
        description: String,
    ) -> Result<CollectionTask, DispatchError> {
        let task = CollectionTask {
            id: TaskId(format!("task-{}", Uuid::new_v4())),
            tenant_id: subject.tenant_id.clone(),
            customer_id: subject.customer.id.clone(),
            debt_id: subject.debt.id.clone(),
            task_type,
            status: TaskStatus::Pending,
            auto_dispatch_blocked,
            origin: origin_of(resolution),
            description,
            created_at: Utc::now(),
        };

        let stored = self.tasks.create(task).await.map_err(DispatchError::Task)?;
        info!(
            debt = %stored.debt_id,
            task = %stored.id.0,
            kind = stored.task_type.label(),
            blocked = stored.auto_dispatch_blocked,
            "collection task opened"
        );

        let action = match task_type {
            TaskType::Assisted => ActionType::AssistedTask,
            TaskType::Manual => ActionType::ManualTask,
        };
        self.record(subject, action, ActionStatus::Created, Some(stored.id.0.clone()))
            .await;

        Ok(stored)
    }

    /// Audit failures are reported but never undo the action they describe.
    async fn record(
        &self,
        subject: &CollectionSubject,
        action_type: ActionType,
        status: ActionStatus,
        detail: Option<String>,
    ) {
        let entry = CollectionActionLog {
            debt_id: subject.debt.id.clone(),
            action_type,
            status,
            detail,
            occurred_at: Utc::now(),
        };
        if let Err(err) = self.logs.append(entry).await {
            warn!(debt = %subject.debt.id, error = %err, "failed to append collection action log");
        }
    }
}

fn origin_of(resolution: &Resolution) -> RuleOrigin {
    RuleOrigin {
        rule_id: resolution.rule.id.clone(),
        revision: resolution.rule.revision,
    }
}

fn reminder_content(subject: &CollectionSubject) -> MessageContent {
    let debt = &subject.debt;
    MessageContent {
        subject: Some(format!("Payment reminder - debt {}", debt.id)),
        body: format!(
            "Hello {}, our records show an open balance of R$ {} due on {} ({} days overdue). \
             Reply to this message or contact us to arrange payment. Reference: {}.",
            subject.customer.name,
            debt.amount.round_dp(2),
            debt.due_date.format("%d/%m/%Y"),
            debt.days_overdue,
            debt.id,
        ),
    }
}
