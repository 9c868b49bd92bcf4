//! Coupon Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases
//! - `infra/` - PostgreSQL and in-memory implementations
//! - `presentation/` - HTTP handlers
//!
//! ## Consistency Model
//! - A coupon's global count never goes below zero
//! - An apply either decrements the global count and records the usage, or does neither
//! - Concurrent applies on one coupon are serialized by a row lock
//! - Verify is read-only and its answer is advisory

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::CouponConfig;
pub use domain::value_objects::ReferenceZone;
pub use error::{CouponError, CouponResult};
pub use infra::memory::InMemoryCouponStore;
pub use infra::postgres::PgCouponRepository;
pub use presentation::router::{coupon_router, coupon_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
