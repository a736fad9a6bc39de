//! Shared utilities and common types for the benefit notifications backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Common validation logic
//! - List limit handling

pub mod pagination;
pub mod validation;
