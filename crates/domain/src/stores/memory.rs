//! In-memory store implementation.
//!
//! Backs all three store traits with a single mutex-guarded state so that
//! cross-store queries (the broadcast audience) behave like the SQL version.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{DeviceRegistry, NotificationStore, PreferenceStore};
use crate::errors::DomainError;
use crate::models::{
    DeviceToken, NewNotification, Notification, NotificationPreferences, Platform,
    PreferenceChanges,
};

#[derive(Default)]
struct State {
    /// Insertion order doubles as the tie-breaker for equal `created_at`.
    notifications: Vec<Notification>,
    tokens: Vec<DeviceToken>,
    preferences: HashMap<Uuid, NotificationPreferences>,
}

/// In-process store for development and testing.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Storage("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn create(&self, new: NewNotification) -> Result<Notification, DomainError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            body: new.body,
            category: new.category,
            priority: new.priority,
            read_at: None,
            is_cleared: false,
            should_push: new.should_push,
            push_sent: false,
            push_error: None,
            sent_at: None,
            created_at: Utc::now(),
        };
        self.lock()?.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, DomainError> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, DomainError> {
        let mut state = self.lock()?;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| DomainError::NotFound("Notification not found".to_string()))?;
        notification.read_at.get_or_insert_with(Utc::now);
        Ok(notification.clone())
    }

    async fn select_pending(&self, limit: i64) -> Result<Vec<Notification>, DomainError> {
        let state = self.lock()?;
        let mut pending: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.is_push_eligible())
            .cloned()
            .collect();
        pending.sort_by_key(|n| n.created_at);
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn record_push_result(
        &self,
        id: Uuid,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| DomainError::NotFound("Notification not found".to_string()))?;

        notification.push_sent = success;
        if success {
            notification.push_error = None;
            notification.sent_at = Some(Utc::now());
        } else {
            notification.push_error = error.map(str::to_string);
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError> {
        let state = self.lock()?;
        let mut list: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_cleared)
            .cloned()
            .collect();
        list.reverse();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>, DomainError> {
        let state = self.lock()?;
        let mut list: Vec<Notification> = state.notifications.iter().rev().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit.max(0) as usize);
        Ok(list)
    }

    async fn clear(&self, user_id: Option<Uuid>) -> Result<u64, DomainError> {
        let mut state = self.lock()?;
        let mut cleared = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| !n.is_cleared && user_id.map_or(true, |u| n.user_id == u))
        {
            n.is_cleared = true;
            cleared += 1;
        }
        Ok(cleared)
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Option<Platform>,
    ) -> Result<DeviceToken, DomainError> {
        let mut state = self.lock()?;
        let now = Utc::now();

        if let Some(existing) = state
            .tokens
            .iter_mut()
            .find(|t| t.user_id == user_id && t.token == token)
        {
            existing.platform = platform;
            existing.last_used_at = now;
            return Ok(existing.clone());
        }

        let record = DeviceToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            platform,
            created_at: now,
            last_used_at: now,
        };
        state.tokens.push(record.clone());
        Ok(record)
    }

    async fn unregister(&self, user_id: Uuid, token: &str) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        let before = state.tokens.len();
        state
            .tokens
            .retain(|t| !(t.user_id == user_id && t.token == token));
        Ok(state.tokens.len() < before)
    }

    async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<DeviceToken>, DomainError> {
        Ok(self
            .lock()?
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn remove_tokens(&self, tokens: &[String]) -> Result<u64, DomainError> {
        let mut state = self.lock()?;
        let before = state.tokens.len();
        state.tokens.retain(|t| !tokens.contains(&t.token));
        Ok((before - state.tokens.len()) as u64)
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn find(&self, user_id: Uuid) -> Result<Option<NotificationPreferences>, DomainError> {
        Ok(self.lock()?.preferences.get(&user_id).cloned())
    }

    async fn get_or_create(&self, user_id: Uuid) -> Result<NotificationPreferences, DomainError> {
        let mut state = self.lock()?;
        Ok(state
            .preferences
            .entry(user_id)
            .or_insert_with(|| NotificationPreferences::defaults(user_id))
            .clone())
    }

    async fn update(
        &self,
        user_id: Uuid,
        changes: &PreferenceChanges,
    ) -> Result<NotificationPreferences, DomainError> {
        let mut state = self.lock()?;
        let prefs = state
            .preferences
            .entry(user_id)
            .or_insert_with(|| NotificationPreferences::defaults(user_id));
        prefs.apply(changes);
        Ok(prefs.clone())
    }

    async fn audience(&self) -> Result<Vec<Uuid>, DomainError> {
        let state = self.lock()?;
        let users: BTreeSet<Uuid> = state
            .preferences
            .keys()
            .copied()
            .chain(state.tokens.iter().map(|t| t.user_id))
            .collect();
        Ok(users.into_iter().collect())
    }
}
