//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.
//! Contains use case implementations.

pub mod apply_coupon;
pub mod config;
pub mod define_coupon;
pub mod verify_coupon;
