//! Email delivery over SMTP.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::alerts::AlertEvent;
use crate::config::EmailConfig;

use super::{NotificationChannel, NotificationError};

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self, NotificationError> {
        let from: Mailbox = config
            .smtp_user
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid sender address: {e}")))?;
        let to: Mailbox = config
            .recipient
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid recipient address: {e}")))?;

        let transport = build_transport(config)?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

/// STARTTLS relay with credentials, shared with the SMS gateway channel.
pub(super) fn build_transport(
    config: &EmailConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        .map_err(|e| NotificationError::Smtp(format!("SMTP transport error: {e}")))?
        .port(config.smtp_port);

    if !config.smtp_user.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.smtp_user.clone(),
            config.smtp_password.clone(),
        ));
    }

    Ok(builder.build())
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let subject = format!(
            "Position Sentinel {} alert: {} on {}",
            event.zone.as_str(),
            event.metric,
            event.asset
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(event.message.clone())
            .map_err(|e| NotificationError::Smtp(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotificationError::Smtp(format!("Failed to send email: {e}")))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(user: &str, recipient: &str) -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_user: user.to_string(),
            smtp_password: "secret".to_string(),
            recipient: recipient.to_string(),
        }
    }

    #[test]
    fn test_valid_addresses_accepted() {
        let channel = EmailChannel::new(&config("alerts@example.com", "ops@example.com"));
        assert!(channel.is_ok());
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let channel = EmailChannel::new(&config("alerts@example.com", "not-an-address"));
        assert!(matches!(channel, Err(NotificationError::Config(_))));
    }
}
