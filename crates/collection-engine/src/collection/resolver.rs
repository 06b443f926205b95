use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{CollectionRule, CustomerId, ProcessType, RuleId, RuleScope, TenantId};
use super::rules::RuleTable;
use super::thresholds::RecoveryThresholds;

/// Identifier of the synthesized rule carrying the built-in score policy.
pub const BUILTIN_RULE_ID: &str = "builtin:score-policy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    Custom,
    TenantDefault,
    BuiltinPolicy,
}

/// The single rule selected for a `(customer, score)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub rule: CollectionRule,
    pub source: RuleSource,
    pub auto_dispatch_blocked: bool,
}

impl Resolution {
    pub fn process_type(&self) -> ProcessType {
        self.rule.process_type
    }
}

/// Pure rule selection over a rule-table snapshot.
#[derive(Debug, Clone, Default)]
pub struct RuleResolver {
    thresholds: RecoveryThresholds,
}

impl RuleResolver {
    pub fn new(thresholds: RecoveryThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RecoveryThresholds {
        &self.thresholds
    }

    /// Custom rules naming the customer win over tenant defaults, which win
    /// over the built-in policy. Within a tier the highest priority wins, then
    /// the most recently created rule, then the greatest id. Scores below the
    /// automatic threshold only ever resolve to manual collection unless a
    /// custom rule names the customer.
    pub fn resolve(
        &self,
        table: &RuleTable,
        tenant: &TenantId,
        customer: &CustomerId,
        score: i32,
    ) -> Resolution {
        let candidates = || {
            table
                .active()
                .filter(|rule| rule.tenant_id == *tenant && rule.covers(score))
        };

        let custom = candidates()
            .filter(|rule| rule.scope.is_custom() && rule.scope.applies_to(customer))
            .max_by(|a, b| precedence(a, b));
        if let Some(rule) = custom {
            return Self::resolution(rule.clone(), RuleSource::Custom);
        }

        // Below the automatic threshold a stored default may only hold the
        // debt for manual collection.
        let automatic_allowed = self.thresholds.allows_automatic(score);
        let tenant_default = candidates()
            .filter(|rule| !rule.scope.is_custom())
            .filter(|rule| automatic_allowed || rule.process_type == ProcessType::Manual)
            .max_by(|a, b| precedence(a, b));
        if let Some(rule) = tenant_default {
            return Self::resolution(rule.clone(), RuleSource::TenantDefault);
        }

        Self::resolution(self.builtin_rule(tenant, score), RuleSource::BuiltinPolicy)
    }

    fn resolution(rule: CollectionRule, source: RuleSource) -> Resolution {
        let auto_dispatch_blocked = rule.process_type == ProcessType::Manual;
        Resolution {
            rule,
            source,
            auto_dispatch_blocked,
        }
    }

    fn builtin_rule(&self, tenant: &TenantId, score: i32) -> CollectionRule {
        let threshold = self.thresholds.automatic_min;
        let (name, process_type, score_min, score_max) = if self.thresholds.allows_automatic(score)
        {
            (
                format!("Built-in policy: score >= {threshold}"),
                ProcessType::Automatic,
                threshold,
                i32::MAX,
            )
        } else {
            (
                format!("Built-in policy: score < {threshold}"),
                ProcessType::Manual,
                i32::MIN,
                threshold.saturating_sub(1),
            )
        };

        CollectionRule {
            id: RuleId(BUILTIN_RULE_ID.to_string()),
            tenant_id: tenant.clone(),
            name,
            priority: i32::MIN,
            scope: RuleScope::Default,
            score_min,
            score_max,
            process_type,
            is_active: true,
            revision: 0,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }
}

fn precedence(a: &CollectionRule, b: &CollectionRule) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
