//! Coupon Router

use crate::application::config::CouponConfig;
use crate::domain::repository::{CouponRepository, CouponUnitOfWork, UsageLedger};
use crate::infra::postgres::PgCouponRepository;
use crate::presentation::handlers::{self, CouponAppState};
use axum::{Router, routing::post};
use std::sync::Arc;

/// Create the coupon router with PostgreSQL repository
pub fn coupon_router(repo: PgCouponRepository, config: CouponConfig) -> Router {
    coupon_router_generic(repo, config)
}

/// Create a generic coupon router for any repository implementation
pub fn coupon_router_generic<R>(repo: R, config: CouponConfig) -> Router
where
    R: CouponRepository + UsageLedger + CouponUnitOfWork + Clone + Send + Sync + 'static,
{
    let state = CouponAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };

    Router::new()
        .route(
            "/add-repeat-counts-code",
            post(handlers::define_coupon::<R>),
        )
        .route("/verify-coupon", post(handlers::verify_coupon::<R>))
        .route("/apply-coupon", post(handlers::apply_coupon::<R>))
        .with_state(state)
}
