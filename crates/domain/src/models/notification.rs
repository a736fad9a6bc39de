//! Notification domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::DomainError;

/// Notification category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Fsa,
    Hsa,
    Pto,
    K401,
    Deductible,
    Trend,
    News,
    Social,
    Gov,
    Manual,
}

impl NotificationCategory {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fsa => "fsa",
            Self::Hsa => "hsa",
            Self::Pto => "pto",
            Self::K401 => "k401",
            Self::Deductible => "deductible",
            Self::Trend => "trend",
            Self::News => "news",
            Self::Social => "social",
            Self::Gov => "gov",
            Self::Manual => "manual",
        }
    }

    /// Parse from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fsa" => Some(Self::Fsa),
            "hsa" => Some(Self::Hsa),
            "pto" => Some(Self::Pto),
            "k401" => Some(Self::K401),
            "deductible" => Some(Self::Deductible),
            "trend" => Some(Self::Trend),
            "news" => Some(Self::News),
            "social" => Some(Self::Social),
            "gov" => Some(Self::Gov),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl Default for NotificationCategory {
    fn default() -> Self {
        Self::Manual
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| DomainError::Validation(format!("Unknown notification category: {}", s)))
    }
}

/// Notification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[serde(alias = "medium")]
    Normal,
    High,
}

impl NotificationPriority {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// Parse from string. `medium` is the legacy spelling of `normal`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "normal" | "medium" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Default for NotificationPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A notification addressed to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub read_at: Option<DateTime<Utc>>,
    pub is_cleared: bool,
    pub should_push: bool,
    pub push_sent: bool,
    pub push_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the recipient has read the notification.
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Whether the dispatcher should still attempt a push for this notification.
    pub fn is_push_eligible(&self) -> bool {
        self.should_push && !self.push_sent
    }
}

/// Input for creating a notification.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewNotification {
    pub user_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    #[validate(custom(function = "validate_text"))]
    pub title: String,

    #[validate(length(min = 1, max = 4000, message = "Body must be between 1 and 4000 characters"))]
    #[validate(custom(function = "validate_text"))]
    pub body: String,

    #[serde(default)]
    pub category: NotificationCategory,

    #[serde(default)]
    pub priority: NotificationPriority,

    #[serde(default = "default_should_push")]
    pub should_push: bool,
}

impl NewNotification {
    /// A manual, normal-priority, push-eligible notification.
    pub fn new(user_id: Uuid, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            body: body.into(),
            category: NotificationCategory::default(),
            priority: NotificationPriority::default(),
            should_push: true,
        }
    }

    pub fn with_category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_should_push(mut self, should_push: bool) -> Self {
        self.should_push = should_push;
        self
    }
}

fn default_should_push() -> bool {
    true
}

fn validate_text(value: &str) -> Result<(), validator::ValidationError> {
    shared::validation::validate_not_blank(value)
}
