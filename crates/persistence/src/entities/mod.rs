//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod device_token;
pub mod notification;
pub mod notification_preference;

pub use device_token::DeviceTokenEntity;
pub use notification::NotificationEntity;
pub use notification_preference::NotificationPreferenceEntity;
