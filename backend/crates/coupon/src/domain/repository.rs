//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.

use chrono::{DateTime, Utc};
use kernel::id::CouponId;

use crate::domain::entities::{Coupon, UsageRecord};
use crate::domain::value_objects::{CouponCode, CouponLimits, UserId};
use crate::error::CouponResult;

/// Coupon store
#[trait_variant::make(CouponRepository: Send)]
pub trait LocalCouponRepository {
    async fn find_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>>;

    /// Create the coupon, or overwrite the limits of the existing one
    async fn upsert(&self, code: &CouponCode, limits: &CouponLimits) -> CouponResult<Coupon>;

    /// Atomically take `amount` from the global count.
    /// Returns false, changing nothing, when fewer than `amount` are left.
    async fn decrement_global_count(&self, coupon_id: CouponId, amount: i32)
    -> CouponResult<bool>;
}

/// Usage ledger, one record per redemption
#[trait_variant::make(UsageLedger: Send)]
pub trait LocalUsageLedger {
    /// Count the user's redemptions of a coupon, optionally only
    /// those with `usage_date >= since`
    async fn count(
        &self,
        user_id: UserId,
        coupon_id: CouponId,
        since: Option<DateTime<Utc>>,
    ) -> CouponResult<i64>;

    async fn insert(
        &self,
        user_id: UserId,
        coupon: &Coupon,
        usage_date: DateTime<Utc>,
    ) -> CouponResult<UsageRecord>;
}

/// A unit of work over both stores
///
/// Dropping a transaction without calling `commit` discards every write
/// made through it.
#[trait_variant::make(CouponTransaction: Send)]
pub trait LocalCouponTransaction: CouponRepository + UsageLedger + Sync {
    /// Find a coupon and hold it exclusively until the transaction ends
    async fn lock_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>>;

    async fn commit(self) -> CouponResult<()>;
}

/// Opens coupon transactions
#[trait_variant::make(CouponUnitOfWork: Send)]
pub trait LocalCouponUnitOfWork {
    type Transaction: CouponTransaction;

    async fn begin(&self) -> CouponResult<Self::Transaction>;
}
