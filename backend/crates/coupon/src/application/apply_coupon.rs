//! Apply Coupon Use Case

use crate::application::config::CouponConfig;
use crate::domain::entities::UsageRecord;
use crate::domain::repository::{
    CouponRepository, CouponTransaction, CouponUnitOfWork, UsageLedger,
};
use crate::domain::value_objects::{CouponCode, UserId};
use crate::error::{CouponError, CouponResult};
use chrono::Utc;
use std::sync::Arc;

/// Output DTO for apply coupon
#[derive(Debug, Clone)]
pub struct ApplyCouponOutput {
    pub usage: UsageRecord,
    /// Global redemptions left after this one
    pub remaining_global_count: i32,
}

/// Apply Coupon Use Case
///
/// Lock, re-evaluate, decrement and record run in one transaction, so two
/// concurrent applies can never both take the last redemption.
pub struct ApplyCouponUseCase<U>
where
    U: CouponUnitOfWork,
{
    uow: Arc<U>,
    config: Arc<CouponConfig>,
}

impl<U> ApplyCouponUseCase<U>
where
    U: CouponUnitOfWork,
{
    pub fn new(uow: Arc<U>, config: Arc<CouponConfig>) -> Self {
        Self { uow, config }
    }

    pub async fn execute(&self, code: &str, user_id: UserId) -> CouponResult<ApplyCouponOutput> {
        let code = CouponCode::new(code).map_err(|_| CouponError::NotFound)?;
        let amount = self.config.redemption_amount;

        let tx = self.uow.begin().await?;

        let coupon = tx
            .lock_by_code(&code)
            .await?
            .ok_or(CouponError::NotFound)?;

        let now = Utc::now();
        let eligibility = self
            .config
            .evaluator()
            .evaluate(&tx, &coupon, user_id, now)
            .await?;

        if !eligibility.is_eligible() {
            tracing::debug!(
                code = %coupon.code,
                user_id = %user_id,
                reason = eligibility.as_str(),
                "Coupon not applicable"
            );
            return Err(CouponError::Ineligible);
        }

        if !tx.decrement_global_count(coupon.id, amount).await? {
            tracing::warn!(
                code = %coupon.code,
                user_id = %user_id,
                "Global count ran out under lock"
            );
            return Err(CouponError::Ineligible);
        }

        let usage = tx.insert(user_id, &coupon, now).await?;
        tx.commit().await?;

        let remaining_global_count = coupon.limits.global_repeat_count - amount;

        tracing::info!(
            coupon_id = %coupon.id,
            code = %coupon.code,
            user_id = %user_id,
            usage_id = %usage.id,
            remaining = remaining_global_count,
            "Coupon applied"
        );

        Ok(ApplyCouponOutput {
            usage,
            remaining_global_count,
        })
    }
}
