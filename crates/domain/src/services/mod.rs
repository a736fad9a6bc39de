//! Domain services for benefit notifications.
//!
//! Services contain business logic that operates on domain models.

pub mod push;
pub mod push_dispatch;

pub use push::{MockPushProvider, PushError, PushMessage, PushProvider};
pub use push_dispatch::{
    DeliveryStatus, DispatchConfig, DispatchOutcome, DispatchSummary, PushDispatcher,
    NO_REGISTERED_DEVICE,
};
