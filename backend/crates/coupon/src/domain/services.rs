//! Domain Services
//!
//! Usage-window arithmetic and the eligibility evaluator.

use chrono::{
    DateTime, Datelike, Days, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc,
};

use crate::domain::entities::Coupon;
use crate::domain::repository::UsageLedger;
use crate::domain::value_objects::{Eligibility, ReferenceZone, UserId};
use crate::error::CouponResult;

/// Start instants of the current day and week, in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindows {
    /// Midnight of the current calendar day
    pub day_start: DateTime<Utc>,
    /// Midnight of the most recent Sunday (today if today is Sunday)
    pub week_start: DateTime<Utc>,
}

impl UsageWindows {
    pub fn at(now: DateTime<Utc>, zone: ReferenceZone) -> Self {
        match zone {
            ReferenceZone::Local => windows_in(&Local, now),
            ReferenceZone::Fixed(offset) => windows_in(&offset, now),
        }
    }
}

fn windows_in<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> UsageWindows {
    let today = now.with_timezone(tz).date_naive();
    let since_sunday = u64::from(today.weekday().num_days_from_sunday());
    let sunday = today.checked_sub_days(Days::new(since_sunday)).unwrap_or(today);

    UsageWindows {
        day_start: start_of_day(tz, today),
        week_start: start_of_day(tz, sunday),
    }
}

/// First instant of `date` in `tz`
///
/// Ambiguous midnights resolve to the earlier instant. Where a DST jump
/// skips midnight, the day begins at the first minute that exists.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        LocalResult::None => (1..=24 * 60)
            .find_map(|minute| {
                tz.from_local_datetime(&(midnight + Duration::minutes(minute)))
                    .earliest()
            })
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// Decides whether a user may redeem a coupon right now
///
/// Checks short-circuit in a fixed order and each one costs at most one
/// ledger read: global (no read), user total, user daily, user weekly.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityEvaluator {
    zone: ReferenceZone,
}

impl EligibilityEvaluator {
    pub fn new(zone: ReferenceZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> ReferenceZone {
        self.zone
    }

    pub async fn evaluate<L>(
        &self,
        ledger: &L,
        coupon: &Coupon,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> CouponResult<Eligibility>
    where
        L: UsageLedger + Sync,
    {
        let limits = &coupon.limits;

        if coupon.is_exhausted() {
            return Ok(Eligibility::GlobalExhausted);
        }

        let total = ledger.count(user_id, coupon.id, None).await?;
        if total >= i64::from(limits.user_total_repeat_count) {
            return Ok(Eligibility::UserTotalReached);
        }

        let windows = UsageWindows::at(now, self.zone);

        let daily = ledger
            .count(user_id, coupon.id, Some(windows.day_start))
            .await?;
        if daily >= i64::from(limits.user_daily_repeat_count) {
            return Ok(Eligibility::UserDailyReached);
        }

        let weekly = ledger
            .count(user_id, coupon.id, Some(windows.week_start))
            .await?;
        if weekly >= i64::from(limits.user_weekly_repeat_count) {
            return Ok(Eligibility::UserWeeklyReached);
        }

        Ok(Eligibility::Eligible)
    }
}
