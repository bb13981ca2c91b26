use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::domain::{Notification, NotificationRequest, NotificationType};
use super::email::{EmailMessage, Mailer};
use super::store::NotificationStore;
use crate::directory::Directory;
use crate::realtime::registry::ConnectionRegistry;
use crate::sequence::{SequenceAllocator, SequenceNamespace};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persists one notification record per recipient/event and fans it out.
///
/// Only the persisted record is authoritative: the live push and the email
/// hand-off are best-effort side channels whose failures never reach the
/// caller.
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    sequences: Arc<dyn SequenceAllocator>,
    directory: Arc<dyn Directory>,
    registry: Arc<ConnectionRegistry>,
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        sequences: Arc<dyn SequenceAllocator>,
        directory: Arc<dyn Directory>,
        registry: Arc<ConnectionRegistry>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            sequences,
            directory,
            registry,
            mailer,
        }
    }

    /// Delivers a notification at least once without duplicating it.
    ///
    /// Correlated notifications (carrying a matching or request id) are
    /// deduplicated against an identical prior record, so callers may retry
    /// the same notification for the same event safely. Persistence failure
    /// is the only hard error.
    pub async fn notify(
        &self,
        request: NotificationRequest,
    ) -> Result<Notification, NotifyError> {
        if request.is_deduplicated() {
            match self.store.find_duplicate(&request).await {
                Ok(Some(existing)) => return Ok(existing),
                Ok(None) => {}
                Err(err) => {
                    // The guard protects against duplicates, not delivery;
                    // fall through to the insert.
                    warn!(citizen_id = %request.citizen_id, error = %err, "dedup lookup failed");
                }
            }
        }

        let seq = self.sequences.next(SequenceNamespace::Notification).await?;
        let notification = Notification {
            notification_id: SequenceNamespace::Notification.format(seq),
            citizen_id: request.citizen_id,
            kind: request.kind,
            description: request.description,
            is_read: false,
            created_at: Utc::now(),
            matching_id: request.matching_id,
            request_id: request.request_id,
        };
        let persisted = self.store.insert(notification).await?;

        let delivered = self
            .registry
            .broadcast(&persisted.citizen_id, &persisted.push_payload());
        debug!(
            notification_id = %persisted.notification_id,
            citizen_id = %persisted.citizen_id,
            channels = delivered,
            "live push"
        );

        self.spawn_email_handoff(persisted.clone());
        Ok(persisted)
    }

    /// Email hand-off runs on its own task; its failures are logged and
    /// invisible to the caller.
    fn spawn_email_handoff(&self, notification: Notification) {
        let directory = self.directory.clone();
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            let contact = match directory.contact(&notification.citizen_id).await {
                Ok(Some(contact)) => contact,
                Ok(None) => return,
                Err(err) => {
                    warn!(citizen_id = %notification.citizen_id, error = %err, "contact lookup failed");
                    return;
                }
            };
            let Some(email) = contact.email else {
                return;
            };

            let subject = match notification.kind {
                NotificationType::Transfer => "GovEase - Transfer Update",
                NotificationType::General => "GovEase - Notification",
            };
            let message = EmailMessage {
                to: email,
                subject: subject.to_string(),
                body: format!(
                    "Hello {},\n\n{}\n\nThank you,\nGovEase",
                    contact.full_name, notification.description
                ),
            };
            if let Err(err) = mailer.send(&message) {
                warn!(
                    notification_id = %notification.notification_id,
                    error = %err,
                    "email hand-off failed"
                );
            }
        });
    }

    pub async fn list(
        &self,
        citizen_id: &str,
        only_unread: bool,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Notification>, NotifyError> {
        Ok(self.store.list(citizen_id, only_unread, skip, limit).await?)
    }

    pub async fn mark_read(
        &self,
        citizen_id: &str,
        notification_id: &str,
    ) -> Result<bool, NotifyError> {
        Ok(self.store.mark_read(citizen_id, notification_id).await?)
    }

    pub async fn mark_all_read(&self, citizen_id: &str) -> Result<u64, NotifyError> {
        Ok(self.store.mark_all_read(citizen_id).await?)
    }
}
