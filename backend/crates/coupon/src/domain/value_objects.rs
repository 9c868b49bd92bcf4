//! Domain Value Objects
//!
//! Immutable value types for the coupon domain.

use std::fmt;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;

use crate::error::{CouponError, CouponResult};

// ============================================================================
// Coupon code
// ============================================================================

/// Promotional code, compared case-sensitively
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    pub const MAX_LEN: usize = 64;

    pub fn new(code: impl Into<String>) -> CouponResult<Self> {
        let code = code.into();

        if code.is_empty() {
            return Err(CouponError::InvalidInput(
                "Coupon code must not be empty".into(),
            ));
        }
        if code.chars().count() > Self::MAX_LEN {
            return Err(CouponError::InvalidInput(format!(
                "Coupon code must be at most {} characters",
                Self::MAX_LEN
            )));
        }
        if code.trim() != code {
            return Err(CouponError::InvalidInput(
                "Coupon code must not start or end with whitespace".into(),
            ));
        }
        if code.chars().any(char::is_control) {
            return Err(CouponError::InvalidInput(
                "Coupon code must not contain control characters".into(),
            ));
        }

        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// User ID
// ============================================================================

/// Caller-supplied user identifier. Users live outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl FromStr for UserId {
    type Err = CouponError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| CouponError::InvalidInput("User ID must be an integer".into()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Limits
// ============================================================================

/// The four independent usage caps of a coupon
///
/// `global_repeat_count` is the number of redemptions left across all users
/// and shrinks with every redemption. The other three are fixed caps per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponLimits {
    pub global_repeat_count: i32,
    pub user_total_repeat_count: i32,
    pub user_daily_repeat_count: i32,
    pub user_weekly_repeat_count: i32,
}

impl CouponLimits {
    pub fn new(
        global_repeat_count: i32,
        user_total_repeat_count: i32,
        user_daily_repeat_count: i32,
        user_weekly_repeat_count: i32,
    ) -> CouponResult<Self> {
        let fields = [
            ("globalRepeatCount", global_repeat_count),
            ("userTotalRepeatCount", user_total_repeat_count),
            ("userDailyRepeatCount", user_daily_repeat_count),
            ("userWeeklyRepeatCount", user_weekly_repeat_count),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| *value < 0) {
            return Err(CouponError::InvalidInput(format!(
                "{name} must be non-negative"
            )));
        }

        Ok(Self {
            global_repeat_count,
            user_total_repeat_count,
            user_daily_repeat_count,
            user_weekly_repeat_count,
        })
    }
}

// ============================================================================
// Reference zone
// ============================================================================

/// Calendar used to place day and week boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceZone {
    /// Host local time zone
    #[default]
    Local,
    /// Fixed UTC offset, immune to host configuration and DST
    Fixed(FixedOffset),
}

impl ReferenceZone {
    pub fn utc() -> Self {
        ReferenceZone::Fixed(Utc.fix())
    }
}

impl FromStr for ReferenceZone {
    type Err = CouponError;

    /// Accepts `local`, `utc` / `z`, or a `±HH:MM` offset
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("local") {
            return Ok(ReferenceZone::Local);
        }
        if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
            return Ok(ReferenceZone::utc());
        }

        let invalid = || CouponError::InvalidInput(format!("Invalid reference zone: {s}"));

        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(hours) || !two_digits(minutes) {
            return Err(invalid());
        }
        let hours: u32 = hours.parse().map_err(|_| invalid())?;
        let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }
        let seconds = i32::try_from(hours * 3600 + minutes * 60).map_err(|_| invalid())?;

        FixedOffset::east_opt(sign * seconds)
            .map(ReferenceZone::Fixed)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceZone::Local => f.write_str("local"),
            ReferenceZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

// ============================================================================
// Eligibility
// ============================================================================

/// Outcome of evaluating a coupon for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    GlobalExhausted,
    UserTotalReached,
    UserDailyReached,
    UserWeeklyReached,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Eligible => "eligible",
            Eligibility::GlobalExhausted => "global_exhausted",
            Eligibility::UserTotalReached => "user_total_reached",
            Eligibility::UserDailyReached => "user_daily_reached",
            Eligibility::UserWeeklyReached => "user_weekly_reached",
        }
    }
}
