use rust_decimal::Decimal;

use super::{ClassificationCriteria, PaymentBehavior};

/// Ceiling that keeps scores comparable across tenants.
pub(super) const MAX_RISK_SCORE: u16 = 200;

pub(super) fn risk_score(criteria: &ClassificationCriteria) -> u16 {
    let mut score = overdue_points(criteria.days_overdue) + amount_points(criteria.amount);

    if let Some(history) = &criteria.history {
        score += match history.payment_behavior {
            Some(PaymentBehavior::Poor) => 30,
            Some(PaymentBehavior::Average) => 15,
            Some(PaymentBehavior::Good) | None => 5,
        };

        score += match history.average_delay_days {
            d if d > 60 => 20,
            d if d > 30 => 10,
            _ => 0,
        };

        score += match history.open_debts {
            n if n > 3 => 15,
            n if n > 1 => 5,
            _ => 0,
        };
    }

    score.min(MAX_RISK_SCORE)
}

fn overdue_points(days: u32) -> u16 {
    match days {
        d if d > 90 => 100,
        d if d > 60 => 80,
        d if d > 30 => 60,
        d if d > 15 => 40,
        _ => 20,
    }
}

fn amount_points(amount: Decimal) -> u16 {
    if amount > Decimal::from(10_000) {
        50
    } else if amount > Decimal::from(5_000) {
        40
    } else if amount > Decimal::from(2_000) {
        30
    } else if amount > Decimal::from(1_000) {
        20
    } else {
        10
    }
}
