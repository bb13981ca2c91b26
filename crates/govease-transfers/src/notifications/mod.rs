//! Notification persistence, deduplication, and best-effort fan-out.

pub mod dispatcher;
pub mod domain;
pub mod email;
pub mod router;
pub mod store;

pub use dispatcher::{NotificationDispatcher, NotifyError};
pub use domain::{Notification, NotificationRequest, NotificationType};
pub use email::{EmailError, EmailMessage, LogMailer, Mailer, RecordingMailer};
pub use router::notification_router;
pub use store::{InMemoryNotificationStore, NotificationStore};
