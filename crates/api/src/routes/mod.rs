//! HTTP route handlers.

pub mod admin_notifications;
pub mod devices;
pub mod health;
pub mod notifications;
pub mod preferences;
