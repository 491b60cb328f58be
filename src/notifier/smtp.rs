//! SMTP delivery for digests via `lettre`

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, Transport};
use tracing::debug;

use crate::config::EmailSettings;
use crate::error::NotifyError;
use crate::notifier::Digest;
use crate::traits::DigestTransport;

/// STARTTLS relay with login credentials; the sender is the login user.
pub struct SmtpTransport {
    settings: EmailSettings,
}

impl SmtpTransport {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    fn build_message(&self, digest: &Digest) -> Result<Message, NotifyError> {
        let from: Mailbox = self
            .settings
            .username
            .parse()
            .map_err(|_| NotifyError::Address(self.settings.username.clone()))?;
        let to: Mailbox = self
            .settings
            .recipient
            .parse()
            .map_err(|_| NotifyError::Address(self.settings.recipient.clone()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(digest.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(digest.html.clone())
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

#[async_trait]
impl DigestTransport for SmtpTransport {
    async fn send(&self, digest: &Digest) -> Result<(), NotifyError> {
        let message = self.build_message(digest)?;
        let settings = self.settings.clone();

        debug!("Sending digest to {} via {}:{}", settings.recipient, settings.host, settings.port);

        tokio::task::spawn_blocking(move || {
            let mailer = lettre::SmtpTransport::starttls_relay(&settings.host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
                .port(settings.port)
                .credentials(Credentials::new(settings.username, settings.password))
                .build();

            mailer
                .send(&message)
                .map(|_| ())
                .map_err(|e| NotifyError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError::Transport(e.to_string()))?
    }
}
