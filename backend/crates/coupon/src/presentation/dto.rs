//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::Coupon;
use crate::domain::value_objects::UserId;
use crate::error::CouponResult;

/// Request for POST /api/coupon/add-repeat-counts-code
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefineCouponRequest {
    pub code: String,
    pub global_repeat_count: i32,
    pub user_total_repeat_count: i32,
    pub user_daily_repeat_count: i32,
    pub user_weekly_repeat_count: i32,
}

/// A user ID as sent by clients, either `42` or `"42"`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserIdInput {
    Number(i64),
    Text(String),
}

impl UserIdInput {
    pub fn parse(&self) -> CouponResult<UserId> {
        match self {
            UserIdInput::Number(n) => Ok(UserId::new(*n)),
            UserIdInput::Text(s) => s.parse(),
        }
    }
}

/// Request for POST /api/coupon/verify-coupon
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCouponRequest {
    pub code: String,
    pub user_id: UserIdInput,
}

/// Request for POST /api/coupon/apply-coupon
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCouponRequest {
    pub code: String,
    pub user_id: UserIdInput,
}

/// Coupon as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    pub global_repeat_count: i32,
    pub user_total_repeat_count: i32,
    pub user_daily_repeat_count: i32,
    pub user_weekly_repeat_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        Self {
            id: coupon.id.into_uuid(),
            code: coupon.code.as_str().to_owned(),
            global_repeat_count: coupon.limits.global_repeat_count,
            user_total_repeat_count: coupon.limits.user_total_repeat_count,
            user_daily_repeat_count: coupon.limits.user_daily_repeat_count,
            user_weekly_repeat_count: coupon.limits.user_weekly_repeat_count,
            created_at: coupon.created_at,
            updated_at: coupon.updated_at,
        }
    }
}

/// Response for POST /api/coupon/verify-coupon
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCouponResponse {
    pub is_valid: bool,
}

/// Response for POST /api/coupon/apply-coupon
#[derive(Debug, Clone, Serialize)]
pub struct ApplyCouponResponse {
    pub message: String,
}
