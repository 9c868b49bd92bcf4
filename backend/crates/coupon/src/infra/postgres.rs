//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{CouponId, CouponUsageId};
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::entities::{Coupon, UsageRecord};
use crate::domain::repository::{
    CouponRepository, CouponTransaction, CouponUnitOfWork, UsageLedger,
};
use crate::domain::value_objects::{CouponCode, CouponLimits, UserId};
use crate::error::{CouponError, CouponResult};

const SELECT_COUPON: &str = r#"
    SELECT
        coupon_id,
        code,
        global_repeat_count,
        user_total_repeat_count,
        user_daily_repeat_count,
        user_weekly_repeat_count,
        created_at,
        updated_at
    FROM coupons
    WHERE code = $1
"#;

/// PostgreSQL-backed coupon store and usage ledger
#[derive(Clone)]
pub struct PgCouponRepository {
    pool: PgPool,
}

impl PgCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CouponRepository for PgCouponRepository {
    async fn find_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
        queries::find_by_code(&self.pool, code, false).await
    }

    async fn upsert(&self, code: &CouponCode, limits: &CouponLimits) -> CouponResult<Coupon> {
        queries::upsert(&self.pool, code, limits).await
    }

    async fn decrement_global_count(
        &self,
        coupon_id: CouponId,
        amount: i32,
    ) -> CouponResult<bool> {
        queries::decrement_global_count(&self.pool, coupon_id, amount).await
    }
}

impl UsageLedger for PgCouponRepository {
    async fn count(
        &self,
        user_id: UserId,
        coupon_id: CouponId,
        since: Option<DateTime<Utc>>,
    ) -> CouponResult<i64> {
        queries::count_usages(&self.pool, user_id, coupon_id, since).await
    }

    async fn insert(
        &self,
        user_id: UserId,
        coupon: &Coupon,
        usage_date: DateTime<Utc>,
    ) -> CouponResult<UsageRecord> {
        queries::insert_usage(&self.pool, &UsageRecord::new(user_id, coupon, usage_date)).await
    }
}

impl CouponUnitOfWork for PgCouponRepository {
    type Transaction = PgCouponTransaction;

    async fn begin(&self) -> CouponResult<PgCouponTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PgCouponTransaction { tx: Mutex::new(tx) })
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// An open database transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgCouponTransaction {
    tx: Mutex<Transaction<'static, Postgres>>,
}

impl CouponRepository for PgCouponTransaction {
    async fn find_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
        let mut tx = self.tx.lock().await;
        queries::find_by_code(conn(&mut tx), code, false).await
    }

    async fn upsert(&self, code: &CouponCode, limits: &CouponLimits) -> CouponResult<Coupon> {
        let mut tx = self.tx.lock().await;
        queries::upsert(conn(&mut tx), code, limits).await
    }

    async fn decrement_global_count(
        &self,
        coupon_id: CouponId,
        amount: i32,
    ) -> CouponResult<bool> {
        let mut tx = self.tx.lock().await;
        queries::decrement_global_count(conn(&mut tx), coupon_id, amount).await
    }
}

impl UsageLedger for PgCouponTransaction {
    async fn count(
        &self,
        user_id: UserId,
        coupon_id: CouponId,
        since: Option<DateTime<Utc>>,
    ) -> CouponResult<i64> {
        let mut tx = self.tx.lock().await;
        queries::count_usages(conn(&mut tx), user_id, coupon_id, since).await
    }

    async fn insert(
        &self,
        user_id: UserId,
        coupon: &Coupon,
        usage_date: DateTime<Utc>,
    ) -> CouponResult<UsageRecord> {
        let record = UsageRecord::new(user_id, coupon, usage_date);
        let mut tx = self.tx.lock().await;
        queries::insert_usage(conn(&mut tx), &record).await
    }
}

impl CouponTransaction for PgCouponTransaction {
    async fn lock_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
        let mut tx = self.tx.lock().await;
        queries::find_by_code(conn(&mut tx), code, true).await
    }

    async fn commit(self) -> CouponResult<()> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }
}

fn conn<'a>(tx: &'a mut Transaction<'static, Postgres>) -> &'a mut PgConnection {
    tx
}

// ============================================================================
// Queries shared by the pool and the transaction
// ============================================================================

mod queries {
    use super::*;

    pub(super) async fn find_by_code<'e, E>(
        executor: E,
        code: &CouponCode,
        for_update: bool,
    ) -> CouponResult<Option<Coupon>>
    where
        E: PgExecutor<'e>,
    {
        let sql = if for_update {
            format!("{SELECT_COUPON} FOR UPDATE")
        } else {
            SELECT_COUPON.to_owned()
        };

        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(code.as_str())
            .fetch_optional(executor)
            .await?;

        row.map(CouponRow::into_coupon).transpose()
    }

    pub(super) async fn upsert<'e, E>(
        executor: E,
        code: &CouponCode,
        limits: &CouponLimits,
    ) -> CouponResult<Coupon>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, CouponRow>(
            r#"
            INSERT INTO coupons (
                coupon_id,
                code,
                global_repeat_count,
                user_total_repeat_count,
                user_daily_repeat_count,
                user_weekly_repeat_count
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO UPDATE SET
                global_repeat_count = EXCLUDED.global_repeat_count,
                user_total_repeat_count = EXCLUDED.user_total_repeat_count,
                user_daily_repeat_count = EXCLUDED.user_daily_repeat_count,
                user_weekly_repeat_count = EXCLUDED.user_weekly_repeat_count,
                updated_at = now()
            RETURNING
                coupon_id,
                code,
                global_repeat_count,
                user_total_repeat_count,
                user_daily_repeat_count,
                user_weekly_repeat_count,
                created_at,
                updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code.as_str())
        .bind(limits.global_repeat_count)
        .bind(limits.user_total_repeat_count)
        .bind(limits.user_daily_repeat_count)
        .bind(limits.user_weekly_repeat_count)
        .fetch_one(executor)
        .await?;

        row.into_coupon()
    }

    pub(super) async fn decrement_global_count<'e, E>(
        executor: E,
        coupon_id: CouponId,
        amount: i32,
    ) -> CouponResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let affected = sqlx::query(
            r#"
            UPDATE coupons
            SET global_repeat_count = global_repeat_count - $2,
                updated_at = now()
            WHERE coupon_id = $1 AND global_repeat_count >= $2
            "#,
        )
        .bind(coupon_id.into_uuid())
        .bind(amount)
        .execute(executor)
        .await?
        .rows_affected();

        Ok(affected == 1)
    }

    pub(super) async fn count_usages<'e, E>(
        executor: E,
        user_id: UserId,
        coupon_id: CouponId,
        since: Option<DateTime<Utc>>,
    ) -> CouponResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM coupon_usages
            WHERE user_id = $1
              AND coupon_id = $2
              AND ($3::timestamptz IS NULL OR usage_date >= $3)
            "#,
        )
        .bind(user_id.value())
        .bind(coupon_id.into_uuid())
        .bind(since)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    pub(super) async fn insert_usage<'e, E>(
        executor: E,
        record: &UsageRecord,
    ) -> CouponResult<UsageRecord>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, UsageRow>(
            r#"
            INSERT INTO coupon_usages (
                coupon_usage_id,
                user_id,
                coupon_id,
                usage_date
            ) VALUES ($1, $2, $3, $4)
            RETURNING
                coupon_usage_id,
                user_id,
                coupon_id,
                usage_date,
                created_at
            "#,
        )
        .bind(record.id.into_uuid())
        .bind(record.user_id.value())
        .bind(record.coupon_id.into_uuid())
        .bind(record.usage_date)
        .fetch_one(executor)
        .await?;

        Ok(row.into_usage_record())
    }
}

// Internal row types for sqlx mapping
#[derive(sqlx::FromRow)]
struct CouponRow {
    coupon_id: Uuid,
    code: String,
    global_repeat_count: i32,
    user_total_repeat_count: i32,
    user_daily_repeat_count: i32,
    user_weekly_repeat_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CouponRow {
    fn into_coupon(self) -> CouponResult<Coupon> {
        let code = CouponCode::new(self.code).map_err(|e| {
            CouponError::Internal(format!("stored coupon {} is invalid: {e}", self.coupon_id))
        })?;

        Ok(Coupon {
            id: CouponId::from_uuid(self.coupon_id),
            code,
            limits: CouponLimits {
                global_repeat_count: self.global_repeat_count,
                user_total_repeat_count: self.user_total_repeat_count,
                user_daily_repeat_count: self.user_daily_repeat_count,
                user_weekly_repeat_count: self.user_weekly_repeat_count,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UsageRow {
    coupon_usage_id: Uuid,
    user_id: i64,
    coupon_id: Uuid,
    usage_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl UsageRow {
    fn into_usage_record(self) -> UsageRecord {
        UsageRecord {
            id: CouponUsageId::from_uuid(self.coupon_usage_id),
            user_id: UserId::new(self.user_id),
            coupon_id: CouponId::from_uuid(self.coupon_id),
            usage_date: self.usage_date,
            created_at: self.created_at,
        }
    }
}
