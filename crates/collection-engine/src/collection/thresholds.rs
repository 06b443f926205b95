use serde::{Deserialize, Serialize};

use super::domain::RecoveryClass;

/// Minimum recovery score for the built-in policy to allow automatic dispatch.
pub const AUTOMATIC_SCORE_THRESHOLD: i32 = 294;

/// Recovery score boundaries. Every bound is an inclusive lower edge: a score
/// equal to `c` is class C and eligible for automatic collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryThresholds {
    pub class_a_min: i32,
    pub class_b_min: i32,
    pub class_c_min: i32,
    pub class_d_min: i32,
    pub class_e_min: i32,
    pub automatic_min: i32,
}

impl Default for RecoveryThresholds {
    fn default() -> Self {
        Self {
            class_a_min: 800,
            class_b_min: 491,
            class_c_min: AUTOMATIC_SCORE_THRESHOLD,
            class_d_min: 131,
            class_e_min: 17,
            automatic_min: AUTOMATIC_SCORE_THRESHOLD,
        }
    }
}

impl RecoveryThresholds {
    pub fn class_for(&self, score: i32) -> RecoveryClass {
        if score >= self.class_a_min {
            RecoveryClass::A
        } else if score >= self.class_b_min {
            RecoveryClass::B
        } else if score >= self.class_c_min {
            RecoveryClass::C
        } else if score >= self.class_d_min {
            RecoveryClass::D
        } else if score >= self.class_e_min {
            RecoveryClass::E
        } else {
            RecoveryClass::F
        }
    }

    pub fn allows_automatic(&self, score: i32) -> bool {
        score >= self.automatic_min
    }
}
