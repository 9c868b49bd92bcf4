//! HTTP Handlers
//!
//! Every handler answers with the `{ success, message?, result? }` envelope.

use crate::application::apply_coupon::ApplyCouponUseCase;
use crate::application::config::CouponConfig;
use crate::application::define_coupon::{DefineCouponInput, DefineCouponUseCase};
use crate::application::verify_coupon::VerifyCouponUseCase;
use crate::domain::repository::{CouponRepository, CouponUnitOfWork, UsageLedger};
use crate::error::CouponError;
use crate::presentation::dto::{
    ApplyCouponRequest, ApplyCouponResponse, CouponResponse, DefineCouponRequest,
    VerifyCouponRequest, VerifyCouponResponse,
};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use kernel::response::ApiEnvelope;
use std::sync::Arc;

/// Shared state for coupon handlers
#[derive(Clone)]
pub struct CouponAppState<R>
where
    R: CouponRepository + UsageLedger + CouponUnitOfWork + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<CouponConfig>,
}

/// POST /api/coupon/add-repeat-counts-code
pub async fn define_coupon<R>(
    State(state): State<CouponAppState<R>>,
    body: Result<Json<DefineCouponRequest>, JsonRejection>,
) -> Response
where
    R: CouponRepository + UsageLedger + CouponUnitOfWork + Clone + Send + Sync + 'static,
{
    let fallback = &state.config.define_failure_message;

    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return CouponError::from(rejection).into_envelope_response(fallback),
    };

    let use_case = DefineCouponUseCase::new(state.repo.clone());
    let input = DefineCouponInput {
        code: req.code,
        global_repeat_count: req.global_repeat_count,
        user_total_repeat_count: req.user_total_repeat_count,
        user_daily_repeat_count: req.user_daily_repeat_count,
        user_weekly_repeat_count: req.user_weekly_repeat_count,
    };

    match use_case.execute(input).await {
        Ok(coupon) => Json(ApiEnvelope::ok(CouponResponse::from(coupon))).into_response(),
        Err(e) => e.into_envelope_response(fallback),
    }
}

/// POST /api/coupon/verify-coupon
pub async fn verify_coupon<R>(
    State(state): State<CouponAppState<R>>,
    body: Result<Json<VerifyCouponRequest>, JsonRejection>,
) -> Response
where
    R: CouponRepository + UsageLedger + CouponUnitOfWork + Clone + Send + Sync + 'static,
{
    let fallback = &state.config.verify_failure_message;

    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return CouponError::from(rejection).into_envelope_response(fallback),
    };
    let user_id = match req.user_id.parse() {
        Ok(id) => id,
        Err(e) => return e.into_envelope_response(fallback),
    };

    let use_case = VerifyCouponUseCase::new(state.repo.clone(), state.config.clone());

    match use_case.execute(&req.code, user_id).await {
        Ok(is_valid) => Json(ApiEnvelope::ok(VerifyCouponResponse { is_valid })).into_response(),
        Err(e) => e.into_envelope_response(fallback),
    }
}

/// POST /api/coupon/apply-coupon
pub async fn apply_coupon<R>(
    State(state): State<CouponAppState<R>>,
    body: Result<Json<ApplyCouponRequest>, JsonRejection>,
) -> Response
where
    R: CouponRepository + UsageLedger + CouponUnitOfWork + Clone + Send + Sync + 'static,
{
    let fallback = &state.config.apply_failure_message;

    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return CouponError::from(rejection).into_envelope_response(fallback),
    };
    let user_id = match req.user_id.parse() {
        Ok(id) => id,
        Err(e) => return e.into_envelope_response(fallback),
    };

    let use_case = ApplyCouponUseCase::new(state.repo.clone(), state.config.clone());

    match use_case.execute(&req.code, user_id).await {
        Ok(_) => Json(ApiEnvelope::ok(ApplyCouponResponse {
            message: state.config.apply_success_message.clone(),
        }))
        .into_response(),
        Err(e) => e.into_envelope_response(fallback),
    }
}
