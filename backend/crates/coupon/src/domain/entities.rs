//! Domain Entities
//!
//! Core business entities for the coupon domain.

use chrono::{DateTime, Utc};
use kernel::id::{CouponId, CouponUsageId};

use crate::domain::value_objects::{CouponCode, CouponLimits, UserId};

/// Coupon entity - a promotional code with four usage limits
#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: CouponId,
    pub code: CouponCode,
    pub limits: CouponLimits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn new(code: CouponCode, limits: CouponLimits) -> Self {
        let now = Utc::now();
        Self {
            id: CouponId::new(),
            code,
            limits,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite all four limits. The code never changes.
    pub fn redefine(&mut self, limits: CouponLimits) {
        self.limits = limits;
        self.updated_at = Utc::now();
    }

    /// No redemptions left for anyone
    pub fn is_exhausted(&self) -> bool {
        self.limits.global_repeat_count <= 0
    }

    /// Take `amount` from the global count if that many are left
    pub fn try_consume(&mut self, amount: i32) -> bool {
        if self.limits.global_repeat_count < amount {
            return false;
        }
        self.limits.global_repeat_count -= amount;
        self.updated_at = Utc::now();
        true
    }
}

/// UsageRecord entity - one successful redemption, never modified
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub id: CouponUsageId,
    pub user_id: UserId,
    pub coupon_id: CouponId,
    pub usage_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(user_id: UserId, coupon: &Coupon, usage_date: DateTime<Utc>) -> Self {
        Self {
            id: CouponUsageId::new(),
            user_id,
            coupon_id: coupon.id,
            usage_date,
            created_at: Utc::now(),
        }
    }
}
