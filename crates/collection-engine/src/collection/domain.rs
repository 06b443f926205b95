use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Client company owning customers, debts, and rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DebtId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DebtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Taxpayer document (CPF or CNPJ) normalized to digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Document(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    Cpf,
    Cnpj,
    Unknown,
}

impl Document {
    pub fn new(raw: &str) -> Self {
        Self(raw.chars().filter(char::is_ascii_digit).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> DocumentKind {
        match self.0.len() {
            11 => DocumentKind::Cpf,
            14 => DocumentKind::Cnpj,
            _ => DocumentKind::Unknown,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<Document> for String {
    fn from(value: Document) -> Self {
        value.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recovery class bands reported by the scoring bureau, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecoveryClass {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl RecoveryClass {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "E" => Some(Self::E),
            "F" => Some(Self::F),
            _ => None,
        }
    }
}

/// Externally computed recoverability score for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryScore {
    pub document: Document,
    pub score: i32,
    pub class: RecoveryClass,
}

/// Collection strategy a rule prescribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Automatic,
    Assisted,
    Manual,
}

impl ProcessType {
    pub const fn label(self) -> &'static str {
        match self {
            ProcessType::Automatic => "automatic",
            ProcessType::Assisted => "assisted",
            ProcessType::Manual => "manual",
        }
    }

    /// Accepts the spellings stored by the rule administration screens.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Some(Self::Automatic),
            "assisted" | "semi_automatic" | "semi-automatic" => Some(Self::Assisted),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Rule applicability: tenant-wide, or restricted to named customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "customers", rename_all = "snake_case")]
pub enum RuleScope {
    Default,
    Custom(BTreeSet<CustomerId>),
}

impl RuleScope {
    pub fn is_custom(&self) -> bool {
        matches!(self, RuleScope::Custom(_))
    }

    pub fn applies_to(&self, customer: &CustomerId) -> bool {
        match self {
            RuleScope::Default => true,
            RuleScope::Custom(customers) => customers.contains(customer),
        }
    }
}

/// Validated collection rule, produced from storage records by
/// [`RuleRecord::validate`](super::rules::RuleRecord::validate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRule {
    pub id: RuleId,
    pub tenant_id: TenantId,
    pub name: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub score_min: i32,
    pub score_max: i32,
    pub process_type: ProcessType,
    pub is_active: bool,
    /// Bumped by every administrative edit.
    pub revision: u32,
    pub created_at: DateTime<Utc>,
}

impl CollectionRule {
    pub fn covers(&self, score: i32) -> bool {
        self.score_min <= score && score <= self.score_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Assisted,
    Manual,
}

impl TaskType {
    pub const fn label(self) -> &'static str {
        match self {
            TaskType::Assisted => "assisted",
            TaskType::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// Rule identity captured on a task so later evaluations can tell whether the
/// rule changed since the task was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOrigin {
    pub rule_id: RuleId,
    pub revision: u32,
}

/// Unit of operator work opened when automation is not permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTask {
    pub id: TaskId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub debt_id: DebtId,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub auto_dispatch_blocked: bool,
    pub origin: RuleOrigin,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AutoMessage,
    AssistedTask,
    ManualTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Sent,
    Failed,
    Created,
    Blocked,
}

/// Write-once audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionActionLog {
    pub debt_id: DebtId,
    pub action_type: ActionType,
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub name: String,
    pub document: Document,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Customer {
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub days_overdue: u32,
}

/// Everything one evaluation needs about a debt and its debtor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSubject {
    pub tenant_id: TenantId,
    pub customer: Customer,
    pub debt: Debt,
    #[serde(default)]
    pub history: Option<super::classification::CustomerHistory>,
}
