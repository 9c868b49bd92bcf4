//! Verify Coupon Use Case

use crate::application::config::CouponConfig;
use crate::domain::repository::{CouponRepository, UsageLedger};
use crate::domain::value_objects::{CouponCode, Eligibility, UserId};
use crate::error::{CouponError, CouponResult};
use chrono::Utc;
use std::sync::Arc;

/// Verify Coupon Use Case
///
/// Read-only. A true answer is advisory: a concurrent apply may still take
/// the last redemption first.
pub struct VerifyCouponUseCase<R>
where
    R: CouponRepository + UsageLedger + Sync,
{
    repo: Arc<R>,
    config: Arc<CouponConfig>,
}

impl<R> VerifyCouponUseCase<R>
where
    R: CouponRepository + UsageLedger + Sync,
{
    pub fn new(repo: Arc<R>, config: Arc<CouponConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, code: &str, user_id: UserId) -> CouponResult<bool> {
        // A malformed code can never have been defined
        let code = CouponCode::new(code).map_err(|_| CouponError::NotFound)?;

        let coupon = self
            .repo
            .find_by_code(&code)
            .await?
            .ok_or(CouponError::NotFound)?;

        let eligibility = self
            .config
            .evaluator()
            .evaluate(self.repo.as_ref(), &coupon, user_id, Utc::now())
            .await?;

        tracing::debug!(
            code = %coupon.code,
            user_id = %user_id,
            eligibility = eligibility.as_str(),
            "Coupon verified"
        );

        Ok(eligibility == Eligibility::Eligible)
    }
}
