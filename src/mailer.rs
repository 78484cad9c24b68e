//! Outbound email collaborator
//!
//! Sending is best effort: callers hand a message to [`Mailer::send`] and
//! never see a failure. The shipped transport records messages in the log;
//! a delivery backend plugs in through [`MailTransport`].

use crate::config::Config;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Delivery backend for outbound email
pub trait MailTransport: Send + Sync {
    fn deliver(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Transport that writes each message to the structured log
pub struct LogTransport {
    from: String,
}

impl LogTransport {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl MailTransport for LogTransport {
    fn deliver(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if !email.to.contains('@') {
            return Err(MailError::InvalidRecipient(email.to.clone()));
        }

        tracing::info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "Outbound email"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct Mailer {
    transport: Option<Arc<dyn MailTransport>>,
}

impl Mailer {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    pub fn disabled() -> Self {
        Self { transport: None }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.mail_enabled {
            Self::new(Arc::new(LogTransport::new(config.mail_from.clone())))
        } else {
            Self::disabled()
        }
    }

    /// Send a message, logging and swallowing any failure
    pub fn send(&self, email: OutboundEmail) {
        let Some(transport) = &self.transport else {
            tracing::debug!("Mail disabled, dropping message to {}", email.to);
            return;
        };

        if let Err(e) = transport.deliver(&email) {
            tracing::warn!("Failed to send email to {}: {}", email.to, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Transport that keeps every delivered message in memory
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<OutboundEmail>>,
    }

    impl MailTransport for RecordingTransport {
        fn deliver(&self, email: &OutboundEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    /// Transport that always fails
    pub struct FailingTransport;

    impl MailTransport for FailingTransport {
        fn deliver(&self, _email: &OutboundEmail) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }
}
