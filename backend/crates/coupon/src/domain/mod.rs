//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (Coupon, UsageRecord)
//! - Domain value objects (CouponCode, CouponLimits, UserId, ReferenceZone)
//! - Domain services (usage windows, eligibility evaluation)
//! - Repository traits (interfaces)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
