use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ClassificationCriteria, PaymentBehavior, RiskTier};

/// Condition over the classification facts. Bounds are documented per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// `days_overdue > n`
    OverdueAbove(u32),
    /// `min <= days_overdue <= max`
    OverdueWithin { min: u32, max: u32 },
    /// `days_overdue < n`
    OverdueBelow(u32),
    /// `amount > value`
    AmountAbove(Decimal),
    PaymentBehavior(PaymentBehavior),
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn holds(&self, criteria: &ClassificationCriteria) -> bool {
        match self {
            Predicate::OverdueAbove(days) => criteria.days_overdue > *days,
            Predicate::OverdueWithin { min, max } => {
                *min <= criteria.days_overdue && criteria.days_overdue <= *max
            }
            Predicate::OverdueBelow(days) => criteria.days_overdue < *days,
            Predicate::AmountAbove(value) => criteria.amount > *value,
            Predicate::PaymentBehavior(expected) => criteria.behavior() == Some(*expected),
            Predicate::All(inner) => inner.iter().all(|p| p.holds(criteria)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub name: String,
    pub tier: RiskTier,
    /// Higher is evaluated first.
    pub priority: i32,
    pub predicate: Predicate,
}

impl ClassificationRule {
    pub fn new(name: &str, tier: RiskTier, priority: i32, predicate: Predicate) -> Self {
        Self {
            name: name.to_string(),
            tier,
            priority,
            predicate,
        }
    }

    pub fn matches(&self, criteria: &ClassificationCriteria) -> bool {
        self.predicate.holds(criteria)
    }
}

pub(super) fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new(
            "Critical - over 90 days",
            RiskTier::Critical,
            100,
            Predicate::OverdueAbove(90),
        ),
        ClassificationRule::new(
            "Critical - high amount over 60 days",
            RiskTier::Critical,
            95,
            Predicate::All(vec![
                Predicate::OverdueAbove(60),
                Predicate::AmountAbove(Decimal::from(5_000)),
            ]),
        ),
        ClassificationRule::new(
            "High - 60 to 90 days",
            RiskTier::High,
            80,
            Predicate::OverdueWithin { min: 60, max: 90 },
        ),
        ClassificationRule::new(
            "High - poor payment behavior over 30 days",
            RiskTier::High,
            75,
            Predicate::All(vec![
                Predicate::OverdueAbove(30),
                Predicate::PaymentBehavior(PaymentBehavior::Poor),
            ]),
        ),
        ClassificationRule::new(
            "Medium - 30 to 59 days",
            RiskTier::Medium,
            60,
            Predicate::OverdueWithin { min: 30, max: 59 },
        ),
        ClassificationRule::new(
            "Medium - high amount under 30 days",
            RiskTier::Medium,
            55,
            Predicate::All(vec![
                Predicate::OverdueBelow(30),
                Predicate::AmountAbove(Decimal::from(10_000)),
            ]),
        ),
        ClassificationRule::new(
            "Low - under 30 days",
            RiskTier::Low,
            20,
            Predicate::OverdueBelow(30),
        ),
    ]
}
