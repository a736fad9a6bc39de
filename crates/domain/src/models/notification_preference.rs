//! Per-user notification preferences and suppression rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notification::{NotificationCategory, NotificationPriority};

/// How often news digests may be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsFrequency {
    Daily,
    Weekly,
    Off,
}

impl NewsFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Off => "off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Which social updates the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SocialUpdates {
    Yes,
    No,
    /// Only very important (high priority) updates.
    VimpOnly,
}

impl SocialUpdates {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::VimpOnly => "vimp-only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "vimp-only" => Some(Self::VimpOnly),
            _ => None,
        }
    }
}

/// Notification preferences of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    pub pto_alerts: bool,
    pub fsa_alerts: bool,
    pub hsa_alerts: bool,
    pub k401_alerts: bool,
    pub deductible_alerts: bool,
    pub trend_alerts: bool,
    pub news_frequency: NewsFrequency,
    pub social_updates: SocialUpdates,
    pub gov_notifications: bool,
    pub all_disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of preferences; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferenceChanges {
    pub pto_alerts: Option<bool>,
    pub fsa_alerts: Option<bool>,
    pub hsa_alerts: Option<bool>,
    pub k401_alerts: Option<bool>,
    pub deductible_alerts: Option<bool>,
    pub trend_alerts: Option<bool>,
    pub news_frequency: Option<NewsFrequency>,
    pub social_updates: Option<SocialUpdates>,
    pub gov_notifications: Option<bool>,
    pub all_disabled: Option<bool>,
}

impl NotificationPreferences {
    /// Default preferences: everything enabled, daily news.
    pub fn defaults(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            pto_alerts: true,
            fsa_alerts: true,
            hsa_alerts: true,
            k401_alerts: true,
            deductible_alerts: true,
            trend_alerts: true,
            news_frequency: NewsFrequency::Daily,
            social_updates: SocialUpdates::Yes,
            gov_notifications: true,
            all_disabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a notification of this category and priority may be created for the user.
    ///
    /// High priority always passes.
    pub fn allows(&self, category: NotificationCategory, priority: NotificationPriority) -> bool {
        if priority == NotificationPriority::High {
            return true;
        }
        if self.all_disabled {
            return false;
        }

        match category {
            NotificationCategory::News => self.news_frequency != NewsFrequency::Off,
            NotificationCategory::Social => self.social_updates == SocialUpdates::Yes,
            NotificationCategory::Gov => self.gov_notifications,
            NotificationCategory::Pto => self.pto_alerts,
            NotificationCategory::Fsa => self.fsa_alerts,
            NotificationCategory::Hsa => self.hsa_alerts,
            NotificationCategory::K401 => self.k401_alerts,
            NotificationCategory::Deductible => self.deductible_alerts,
            NotificationCategory::Trend => self.trend_alerts,
            NotificationCategory::Manual => true,
        }
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply(&mut self, changes: &PreferenceChanges) {
        if let Some(v) = changes.pto_alerts {
            self.pto_alerts = v;
        }
        if let Some(v) = changes.fsa_alerts {
            self.fsa_alerts = v;
        }
        if let Some(v) = changes.hsa_alerts {
            self.hsa_alerts = v;
        }
        if let Some(v) = changes.k401_alerts {
            self.k401_alerts = v;
        }
        if let Some(v) = changes.deductible_alerts {
            self.deductible_alerts = v;
        }
        if let Some(v) = changes.trend_alerts {
            self.trend_alerts = v;
        }
        if let Some(v) = changes.news_frequency {
            self.news_frequency = v;
        }
        if let Some(v) = changes.social_updates {
            self.social_updates = v;
        }
        if let Some(v) = changes.gov_notifications {
            self.gov_notifications = v;
        }
        if let Some(v) = changes.all_disabled {
            self.all_disabled = v;
        }
        self.updated_at = Utc::now();
    }
}
