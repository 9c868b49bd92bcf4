//! Shared Kernel - Domain-crossing minimal core
//!
//! Vocabulary every backend crate agrees on:
//! - The unified error type and its HTTP classification
//! - The `{ success, message, result }` response envelope
//! - Typed UUID identifiers

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
pub mod response;
