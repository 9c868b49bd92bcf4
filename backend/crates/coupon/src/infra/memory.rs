//! In-Memory Repository Implementations
//!
//! Used when no database is configured, and by the test suite.
//! A transaction holds the store lock for its whole lifetime and writes in
//! place, keeping an undo log; commit discards the log, drop replays it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::CouponId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entities::{Coupon, UsageRecord};
use crate::domain::repository::{
    CouponRepository, CouponTransaction, CouponUnitOfWork, UsageLedger,
};
use crate::domain::value_objects::{CouponCode, CouponLimits, UserId};
use crate::error::CouponResult;

type UsageKey = (CouponId, UserId);

#[derive(Debug, Default)]
struct StoreState {
    coupons: HashMap<CouponCode, Coupon>,
    usages: HashMap<UsageKey, Vec<UsageRecord>>,
    usage_total: usize,
}

/// Reverts one write made inside a transaction
#[derive(Debug)]
enum Undo {
    RestoreCoupon {
        code: CouponCode,
        previous: Option<Coupon>,
    },
    RemoveUsage(UsageKey),
}

impl StoreState {
    fn find(&self, code: &CouponCode) -> Option<Coupon> {
        self.coupons.get(code).cloned()
    }

    fn find_by_id(&self, coupon_id: CouponId) -> Option<&Coupon> {
        self.coupons.values().find(|c| c.id == coupon_id)
    }

    fn upsert(&mut self, code: &CouponCode, limits: &CouponLimits) -> Coupon {
        let coupon = self
            .coupons
            .entry(code.clone())
            .and_modify(|c| c.redefine(*limits))
            .or_insert_with(|| Coupon::new(code.clone(), *limits));
        coupon.clone()
    }

    fn decrement(&mut self, coupon_id: CouponId, amount: i32) -> bool {
        self.coupons
            .values_mut()
            .find(|c| c.id == coupon_id)
            .is_some_and(|c| c.try_consume(amount))
    }

    fn count(&self, user_id: UserId, coupon_id: CouponId, since: Option<DateTime<Utc>>) -> i64 {
        let n = self.usages.get(&(coupon_id, user_id)).map_or(0, |records| {
            records
                .iter()
                .filter(|u| since.is_none_or(|since| u.usage_date >= since))
                .count()
        });
        i64::try_from(n).unwrap_or(i64::MAX)
    }

    fn insert(&mut self, record: UsageRecord) -> UsageRecord {
        self.usages
            .entry((record.coupon_id, record.user_id))
            .or_default()
            .push(record.clone());
        self.usage_total += 1;
        record
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::RestoreCoupon {
                code,
                previous: Some(coupon),
            } => {
                self.coupons.insert(code, coupon);
            }
            Undo::RestoreCoupon {
                code,
                previous: None,
            } => {
                self.coupons.remove(&code);
            }
            Undo::RemoveUsage(key) => {
                if let Some(records) = self.usages.get_mut(&key) {
                    if records.pop().is_some() {
                        self.usage_total -= 1;
                    }
                    if records.is_empty() {
                        self.usages.remove(&key);
                    }
                }
            }
        }
    }
}

/// Process-local coupon store and usage ledger
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryCouponStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed view of a coupon
    pub async fn coupon(&self, code: &str) -> Option<Coupon> {
        let code = CouponCode::new(code).ok()?;
        self.state.lock().await.find(&code)
    }

    /// Number of committed usage records across all coupons
    pub async fn usage_count(&self) -> usize {
        self.state.lock().await.usage_total
    }
}

impl CouponRepository for InMemoryCouponStore {
    async fn find_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
        Ok(self.state.lock().await.find(code))
    }

    async fn upsert(&self, code: &CouponCode, limits: &CouponLimits) -> CouponResult<Coupon> {
        Ok(self.state.lock().await.upsert(code, limits))
    }

    async fn decrement_global_count(
        &self,
        coupon_id: CouponId,
        amount: i32,
    ) -> CouponResult<bool> {
        Ok(self.state.lock().await.decrement(coupon_id, amount))
    }
}

impl UsageLedger for InMemoryCouponStore {
    async fn count(
        &self,
        user_id: UserId,
        coupon_id: CouponId,
        since: Option<DateTime<Utc>>,
    ) -> CouponResult<i64> {
        Ok(self.state.lock().await.count(user_id, coupon_id, since))
    }

    async fn insert(
        &self,
        user_id: UserId,
        coupon: &Coupon,
        usage_date: DateTime<Utc>,
    ) -> CouponResult<UsageRecord> {
        let record = UsageRecord::new(user_id, coupon, usage_date);
        Ok(self.state.lock().await.insert(record))
    }
}

impl CouponUnitOfWork for InMemoryCouponStore {
    type Transaction = InMemoryCouponTransaction;

    async fn begin(&self) -> CouponResult<InMemoryCouponTransaction> {
        let state = Arc::clone(&self.state).lock_owned().await;
        Ok(InMemoryCouponTransaction {
            inner: Mutex::new(TxState {
                state,
                undo: Vec::new(),
            }),
        })
    }
}

struct TxState {
    state: OwnedMutexGuard<StoreState>,
    undo: Vec<Undo>,
}

/// Exclusive transaction over an [`InMemoryCouponStore`]
pub struct InMemoryCouponTransaction {
    inner: Mutex<TxState>,
}

impl Drop for InMemoryCouponTransaction {
    fn drop(&mut self) {
        let tx = self.inner.get_mut();
        while let Some(undo) = tx.undo.pop() {
            tx.state.revert(undo);
        }
    }
}

impl CouponRepository for InMemoryCouponTransaction {
    async fn find_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
        Ok(self.inner.lock().await.state.find(code))
    }

    async fn upsert(&self, code: &CouponCode, limits: &CouponLimits) -> CouponResult<Coupon> {
        let mut tx = self.inner.lock().await;
        let previous = tx.state.find(code);
        let coupon = tx.state.upsert(code, limits);
        tx.undo.push(Undo::RestoreCoupon {
            code: code.clone(),
            previous,
        });
        Ok(coupon)
    }

    async fn decrement_global_count(
        &self,
        coupon_id: CouponId,
        amount: i32,
    ) -> CouponResult<bool> {
        let mut tx = self.inner.lock().await;
        let Some(previous) = tx.state.find_by_id(coupon_id).cloned() else {
            return Ok(false);
        };
        if !tx.state.decrement(coupon_id, amount) {
            return Ok(false);
        }
        tx.undo.push(Undo::RestoreCoupon {
            code: previous.code.clone(),
            previous: Some(previous),
        });
        Ok(true)
    }
}

impl UsageLedger for InMemoryCouponTransaction {
    async fn count(
        &self,
        user_id: UserId,
        coupon_id: CouponId,
        since: Option<DateTime<Utc>>,
    ) -> CouponResult<i64> {
        Ok(self.inner.lock().await.state.count(user_id, coupon_id, since))
    }

    async fn insert(
        &self,
        user_id: UserId,
        coupon: &Coupon,
        usage_date: DateTime<Utc>,
    ) -> CouponResult<UsageRecord> {
        let record = UsageRecord::new(user_id, coupon, usage_date);
        let mut tx = self.inner.lock().await;
        tx.undo
            .push(Undo::RemoveUsage((record.coupon_id, record.user_id)));
        Ok(tx.state.insert(record))
    }
}

impl CouponTransaction for InMemoryCouponTransaction {
    async fn lock_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
        // The whole store is already held by this transaction
        Ok(self.inner.lock().await.state.find(code))
    }

    async fn commit(self) -> CouponResult<()> {
        self.inner.lock().await.undo.clear();
        Ok(())
    }
}
