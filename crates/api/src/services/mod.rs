//! Integrations with external services.

pub mod fcm;

pub use fcm::{FcmError, FcmPushProvider};
