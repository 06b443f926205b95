mod rules;
mod score;

pub use rules::{ClassificationRule, Predicate};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Applied-rule marker reported when no predicate matched.
pub const NO_RULE_MATCHED: &str = "Default - no specific rule matched";

/// Risk tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub const fn label(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentBehavior {
    Good,
    Average,
    Poor,
}

/// Prior behaviour of the debtor across the tenant's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerHistory {
    pub previous_payments: u32,
    pub average_delay_days: u32,
    pub open_debts: u32,
    #[serde(default)]
    pub payment_behavior: Option<PaymentBehavior>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCriteria {
    pub days_overdue: u32,
    pub amount: Decimal,
    #[serde(default)]
    pub history: Option<CustomerHistory>,
}

impl ClassificationCriteria {
    pub(crate) fn behavior(&self) -> Option<PaymentBehavior> {
        self.history.as_ref().and_then(|h| h.payment_behavior)
    }
}

/// Classifier output. `matched` is false when the default branch was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub applied_rule: String,
    pub score: u16,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationStats {
    pub total: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
    pub average_score: f64,
}

/// Stateless first-match classifier over a priority-sorted predicate table.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(rules::default_rules())
    }
}

impl RiskClassifier {
    /// Sorts the table by descending priority. The sort is stable, so rules
    /// sharing a priority keep the order they were supplied in.
    pub fn new(mut rules: Vec<ClassificationRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn classify(&self, criteria: &ClassificationCriteria) -> RiskAssessment {
        let score = score::risk_score(criteria);

        match self.rules.iter().find(|rule| rule.matches(criteria)) {
            Some(rule) => RiskAssessment {
                tier: rule.tier,
                applied_rule: rule.name.clone(),
                score,
                matched: true,
            },
            None => RiskAssessment {
                tier: RiskTier::Low,
                applied_rule: NO_RULE_MATCHED.to_string(),
                score,
                matched: false,
            },
        }
    }

    pub fn classify_batch(&self, criteria: &[ClassificationCriteria]) -> Vec<RiskAssessment> {
        criteria.iter().map(|item| self.classify(item)).collect()
    }

    pub fn stats(&self, criteria: &[ClassificationCriteria]) -> ClassificationStats {
        let mut stats = ClassificationStats {
            total: criteria.len(),
            low: 0,
            medium: 0,
            high: 0,
            critical: 0,
            average_score: 0.0,
        };

        let mut total_score: u64 = 0;
        for assessment in self.classify_batch(criteria) {
            match assessment.tier {
                RiskTier::Low => stats.low += 1,
                RiskTier::Medium => stats.medium += 1,
                RiskTier::High => stats.high += 1,
                RiskTier::Critical => stats.critical += 1,
            }
            total_score += u64::from(assessment.score);
        }

        if stats.total > 0 {
            stats.average_score = total_score as f64 / stats.total as f64;
        }

        stats
    }
}

/// Operator hint for the next step on a debt.
pub fn recommended_action(tier: RiskTier, days_overdue: u32) -> &'static str {
    match tier {
        RiskTier::Critical if days_overdue > 120 => "legal action or credit bureau listing",
        RiskTier::Critical => "urgent phone call",
        RiskTier::High => "collection email and SMS",
        RiskTier::Medium => "collection email",
        RiskTier::Low => "reminder email",
    }
}
