//! Define Coupon Use Case

use crate::domain::entities::Coupon;
use crate::domain::repository::CouponRepository;
use crate::domain::value_objects::{CouponCode, CouponLimits};
use crate::error::CouponResult;
use std::sync::Arc;

/// Input DTO for define coupon
#[derive(Debug, Clone)]
pub struct DefineCouponInput {
    pub code: String,
    pub global_repeat_count: i32,
    pub user_total_repeat_count: i32,
    pub user_daily_repeat_count: i32,
    pub user_weekly_repeat_count: i32,
}

/// Define Coupon Use Case
///
/// Creates the coupon, or overwrites every limit of an existing one.
/// Usage history is left untouched.
pub struct DefineCouponUseCase<R>
where
    R: CouponRepository,
{
    repo: Arc<R>,
}

impl<R> DefineCouponUseCase<R>
where
    R: CouponRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, input: DefineCouponInput) -> CouponResult<Coupon> {
        let code = CouponCode::new(input.code)?;
        let limits = CouponLimits::new(
            input.global_repeat_count,
            input.user_total_repeat_count,
            input.user_daily_repeat_count,
            input.user_weekly_repeat_count,
        )?;

        let coupon = self.repo.upsert(&code, &limits).await?;

        tracing::info!(
            coupon_id = %coupon.id,
            code = %coupon.code,
            global = limits.global_repeat_count,
            user_total = limits.user_total_repeat_count,
            user_daily = limits.user_daily_repeat_count,
            user_weekly = limits.user_weekly_repeat_count,
            "Coupon limits defined"
        );

        Ok(coupon)
    }
}
