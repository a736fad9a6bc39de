//! PostgreSQL implementations of the domain store traits.

pub mod device_token;
pub mod notification;
pub mod notification_preference;

pub use device_token::DeviceTokenRepository;
pub use notification::NotificationRepository;
pub use notification_preference::NotificationPreferenceRepository;
