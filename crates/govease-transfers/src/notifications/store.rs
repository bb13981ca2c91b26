use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::domain::{Notification, NotificationRequest};
use crate::store::StoreError;

/// Persistence seam for citizen notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Inserts a new record; `Conflict` on a duplicate notification id.
    async fn insert(&self, notification: Notification) -> Result<Notification, StoreError>;

    /// An existing record with identical (citizen, type, matching_id,
    /// request_id, description), if any.
    ///
    /// The lookup and the subsequent insert are separate steps: two
    /// concurrent identical `notify` calls can both miss here and each
    /// persist a record. Delivery is at-least-once; readers tolerate the
    /// rare duplicate.
    async fn find_duplicate(
        &self,
        request: &NotificationRequest,
    ) -> Result<Option<Notification>, StoreError>;

    /// A citizen's notifications, newest first, with skip/limit paging.
    async fn list(
        &self,
        citizen_id: &str,
        only_unread: bool,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Returns false when no record matches the citizen + id pair.
    async fn mark_read(&self, citizen_id: &str, notification_id: &str)
        -> Result<bool, StoreError>;

    /// Returns the number of records flipped to read.
    async fn mark_all_read(&self, citizen_id: &str) -> Result<u64, StoreError>;
}

/// Process-local notification store.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: Mutex<HashMap<String, Notification>>,
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("notification store poisoned".to_string()))?;
        if records.contains_key(&notification.notification_id) {
            return Err(StoreError::Conflict);
        }
        records.insert(notification.notification_id.clone(), notification.clone());
        Ok(notification)
    }

    async fn find_duplicate(
        &self,
        request: &NotificationRequest,
    ) -> Result<Option<Notification>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("notification store poisoned".to_string()))?;
        Ok(records
            .values()
            .find(|existing| {
                existing.citizen_id == request.citizen_id
                    && existing.kind == request.kind
                    && existing.matching_id == request.matching_id
                    && existing.request_id == request.request_id
                    && existing.description == request.description
            })
            .cloned())
    }

    async fn list(
        &self,
        citizen_id: &str,
        only_unread: bool,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("notification store poisoned".to_string()))?;
        let mut notifications: Vec<Notification> = records
            .values()
            .filter(|existing| {
                existing.citizen_id == citizen_id && (!only_unread || !existing.is_read)
            })
            .cloned()
            .collect();
        notifications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.notification_id.cmp(&a.notification_id))
        });
        Ok(notifications.into_iter().skip(skip).take(limit).collect())
    }

    async fn mark_read(
        &self,
        citizen_id: &str,
        notification_id: &str,
    ) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("notification store poisoned".to_string()))?;
        match records.get_mut(notification_id) {
            Some(existing) if existing.citizen_id == citizen_id => {
                existing.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, citizen_id: &str) -> Result<u64, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("notification store poisoned".to_string()))?;
        let mut updated = 0;
        for existing in records.values_mut() {
            if existing.citizen_id == citizen_id && !existing.is_read {
                existing.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
