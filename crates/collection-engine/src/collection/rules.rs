use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CollectionRule, CustomerId, ProcessType, RuleId, RuleScope, TenantId};

/// Rule row as persisted by the administration screens. Untrusted until
/// [`RuleRecord::validate`] has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub rule_type: String,
    #[serde(default)]
    pub active_for_customers: Vec<String>,
    pub min_score: i32,
    pub max_score: i32,
    pub process_type: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub revision: u32,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule {rule} has unknown process type '{value}'")]
    UnknownProcessType { rule: String, value: String },
    #[error("rule {rule} has unknown scope '{value}'")]
    UnknownScope { rule: String, value: String },
    #[error("rule {rule} score range {min}..={max} is empty")]
    InvertedRange { rule: String, min: i32, max: i32 },
    #[error("custom rule {rule} does not name any customer")]
    EmptyCustomScope { rule: String },
    #[error("rule {rule} belongs to tenant {found}, expected {expected}")]
    TenantMismatch {
        rule: String,
        expected: String,
        found: String,
    },
    #[error("rule id {0} appears more than once in the tenant table")]
    RuleConflict(String),
}

impl RuleRecord {
    pub fn validate(self) -> Result<CollectionRule, RuleValidationError> {
        let process_type = ProcessType::parse(&self.process_type).ok_or_else(|| {
            RuleValidationError::UnknownProcessType {
                rule: self.id.clone(),
                value: self.process_type.clone(),
            }
        })?;

        if self.min_score > self.max_score {
            return Err(RuleValidationError::InvertedRange {
                rule: self.id,
                min: self.min_score,
                max: self.max_score,
            });
        }

        let scope = match self.rule_type.trim().to_ascii_lowercase().as_str() {
            "default" => RuleScope::Default,
            "custom" => {
                let customers: BTreeSet<CustomerId> = self
                    .active_for_customers
                    .iter()
                    .map(|id| id.trim())
                    .filter(|id| !id.is_empty())
                    .map(|id| CustomerId(id.to_string()))
                    .collect();
                if customers.is_empty() {
                    return Err(RuleValidationError::EmptyCustomScope { rule: self.id });
                }
                RuleScope::Custom(customers)
            }
            other => {
                return Err(RuleValidationError::UnknownScope {
                    rule: self.id.clone(),
                    value: other.to_string(),
                })
            }
        };

        Ok(CollectionRule {
            id: RuleId(self.id),
            tenant_id: TenantId(self.tenant_id),
            name: self.name,
            priority: self.priority,
            scope,
            score_min: self.min_score,
            score_max: self.max_score,
            process_type,
            is_active: self.is_active,
            revision: self.revision,
            created_at: self.created_at,
        })
    }
}

/// Validated snapshot of one tenant's rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<CollectionRule>,
}

impl RuleTable {
    pub fn from_records(
        tenant: &TenantId,
        records: Vec<RuleRecord>,
    ) -> Result<Self, RuleValidationError> {
        let rules = records
            .into_iter()
            .map(RuleRecord::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(tenant, rules)
    }

    pub fn new(tenant: &TenantId, rules: Vec<CollectionRule>) -> Result<Self, RuleValidationError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.tenant_id != *tenant {
                return Err(RuleValidationError::TenantMismatch {
                    rule: rule.id.0.clone(),
                    expected: tenant.0.clone(),
                    found: rule.tenant_id.0.clone(),
                });
            }
            if !seen.insert(rule.id.clone()) {
                return Err(RuleValidationError::RuleConflict(rule.id.0.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[CollectionRule] {
        &self.rules
    }

    pub fn active(&self) -> impl Iterator<Item = &CollectionRule> {
        self.rules.iter().filter(|rule| rule.is_active)
    }
}
