//! Infrastructure Layer
//!
//! Storage backends for coupons and usage records.

pub mod memory;
pub mod postgres;
