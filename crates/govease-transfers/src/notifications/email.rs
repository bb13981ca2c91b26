use std::sync::{Arc, Mutex};

use tracing::info;

/// Outbound email payload handed to the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email transport unavailable: {0}")]
    Transport(String),
}

/// Seam for the email transport. Actual SMTP delivery happens outside this
/// crate; the dispatcher only hands records over and tolerates failure.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Default mailer: logs the hand-off instead of delivering.
#[derive(Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(to = %message.to, subject = %message.subject, "email hand-off");
        Ok(())
    }
}

/// Captures sent messages so tests can assert on the hand-off.
#[derive(Default, Clone)]
pub struct RecordingMailer {
    messages: Arc<Mutex<Vec<EmailMessage>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingMailer {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().expect("mailer mutex poisoned").clone()
    }

    pub fn fail_next_sends(&self, fail: bool) {
        *self.fail.lock().expect("mailer mutex poisoned") = fail;
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if *self.fail.lock().expect("mailer mutex poisoned") {
            return Err(EmailError::Transport("simulated outage".to_string()));
        }
        self.messages
            .lock()
            .expect("mailer mutex poisoned")
            .push(message.clone());
        Ok(())
    }
}
