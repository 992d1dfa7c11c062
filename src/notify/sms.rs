//! SMS delivery via a carrier email-to-SMS gateway.
//!
//! Carriers expose `{number}@{gateway}` addresses that forward email
//! bodies as text messages, so this channel rides the same SMTP transport
//! as [`super::EmailChannel`].

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::alerts::AlertEvent;
use crate::config::{EmailConfig, SmsConfig};

use super::email::build_transport;
use super::{NotificationChannel, NotificationError};

/// Carrier gateways truncate anyway; keep messages inside one segment.
const MAX_SMS_LEN: usize = 160;

pub struct SmsChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmsChannel {
    pub fn new(email: &EmailConfig, sms: &SmsConfig) -> Result<Self, NotificationError> {
        let from: Mailbox = email
            .smtp_user
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid sender address: {e}")))?;

        let gateway_address = format!("{}@{}", sms.recipient_number, sms.carrier_gateway);
        let to: Mailbox = gateway_address
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid SMS gateway address: {e}")))?;

        let transport = build_transport(email)?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    fn truncate(message: &str) -> String {
        if message.len() <= MAX_SMS_LEN {
            return message.to_string();
        }
        let mut cut = MAX_SMS_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message[..cut].to_string()
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    async fn send(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("{} {}", event.zone.as_str(), event.asset))
            .header(ContentType::TEXT_PLAIN)
            .body(Self::truncate(&event.message))
            .map_err(|e| NotificationError::Smtp(format!("Failed to build SMS email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotificationError::Smtp(format!("Failed to send SMS: {e}")))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "sms"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_address_is_number_at_gateway() {
        let email = EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_user: "alerts@example.com".to_string(),
            smtp_password: "secret".to_string(),
            recipient: "ops@example.com".to_string(),
        };
        let sms = SmsConfig {
            carrier_gateway: "vtext.com".to_string(),
            recipient_number: "5551234567".to_string(),
        };
        let channel = SmsChannel::new(&email, &sms).unwrap();
        assert_eq!(channel.to.email.to_string(), "5551234567@vtext.com");
    }

    #[test]
    fn test_truncation_caps_at_one_segment() {
        let long = "x".repeat(400);
        assert_eq!(SmsChannel::truncate(&long).len(), MAX_SMS_LEN);
        assert_eq!(SmsChannel::truncate("short"), "short");
    }
}
