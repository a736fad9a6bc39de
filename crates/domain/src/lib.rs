//! Domain layer for the benefit notifications backend.
//!
//! This crate contains:
//! - Domain models (Notification, DeviceToken, NotificationPreferences)
//! - Store traits and in-memory store implementations
//! - Push delivery abstractions and the push dispatcher
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
pub mod stores;

pub use errors::DomainError;
