//! Application Configuration
//!
//! Configuration for the coupon application layer.

use crate::domain::services::EligibilityEvaluator;
use crate::domain::value_objects::ReferenceZone;

/// Coupon application configuration
#[derive(Debug, Clone)]
pub struct CouponConfig {
    /// Calendar that day and week windows are computed in
    pub reference_zone: ReferenceZone,
    /// Redemptions taken from the global count per apply
    pub redemption_amount: i32,
    /// Envelope message for unexpected failures, per operation
    pub define_failure_message: String,
    pub verify_failure_message: String,
    pub apply_failure_message: String,
    /// Envelope message of a successful apply
    pub apply_success_message: String,
}

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            reference_zone: ReferenceZone::Local,
            redemption_amount: 1,
            define_failure_message: "Error adding repeat counts to code".to_string(),
            verify_failure_message: "Error in validating coupon".to_string(),
            apply_failure_message: "Error applying coupon".to_string(),
            apply_success_message: "Coupon applied Successfully".to_string(),
        }
    }
}

impl CouponConfig {
    pub fn with_reference_zone(reference_zone: ReferenceZone) -> Self {
        Self {
            reference_zone,
            ..Default::default()
        }
    }

    pub fn evaluator(&self) -> EligibilityEvaluator {
        EligibilityEvaluator::new(self.reference_zone)
    }
}
