//! Domain models for benefit notifications.

pub mod device_token;
pub mod notification;
pub mod notification_preference;

pub use device_token::{
    mask_token, DeviceToken, DeviceTokenResponse, Platform, RegisterDeviceTokenRequest,
};
pub use notification::{NewNotification, Notification, NotificationCategory, NotificationPriority};
pub use notification_preference::{
    NewsFrequency, NotificationPreferences, PreferenceChanges, SocialUpdates,
};
