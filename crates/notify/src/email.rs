//! SMTP mailer via `lettre` with TLS support.
//!
//! Port 465 uses implicit TLS, any other port STARTTLS.

use crate::traits::{Mailer, NotifyError, OutgoingEmail};
use examly_core::config::SmtpConfig;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Sends email through an authenticated SMTP relay.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build from SMTP configuration. Fails with `NotConfigured` unless host,
    /// user and password are all present.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let (Some(host), Some(username), Some(password)) =
            (&config.host, &config.username, &config.password)
        else {
            return Err(NotifyError::NotConfigured);
        };

        let from: Mailbox = config
            .sender()
            .unwrap_or(username)
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| NotifyError::Config(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, NotifyError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "smtp",
            subject = %email.subject,
            "email delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: Some("smtp.example.com".into()),
            port: 587,
            username: Some("mailer@example.com".into()),
            password: Some("secret".into()),
            from: None,
            app_url: "http://localhost:3000".into(),
        }
    }

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.into(),
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
            text: "Hi".into(),
        }
    }

    #[test]
    fn from_config_valid() {
        assert!(SmtpMailer::from_config(&config()).is_ok());
    }

    #[test]
    fn from_config_implicit_tls_port() {
        let mut c = config();
        c.port = 465;
        assert!(SmtpMailer::from_config(&c).is_ok());
    }

    #[test]
    fn missing_credentials_is_not_configured() {
        let mut c = config();
        c.password = None;
        assert!(matches!(
            SmtpMailer::from_config(&c).unwrap_err(),
            NotifyError::NotConfigured
        ));
    }

    #[test]
    fn from_config_invalid_sender() {
        let mut c = config();
        c.from = Some("bad-address".into());
        let err = SmtpMailer::from_config(&c).unwrap_err().to_string();
        assert!(err.contains("Configuration error"), "got: {err}");
    }

    #[test]
    fn sender_with_display_name() {
        let mut c = config();
        c.from = Some("Examly <no-reply@example.com>".into());
        let mailer = SmtpMailer::from_config(&c).unwrap();
        assert_eq!(mailer.from.email.to_string(), "no-reply@example.com");
    }

    #[test]
    fn invalid_recipient_is_rejected_before_sending() {
        let mailer = SmtpMailer::from_config(&config()).unwrap();
        assert!(mailer.build_message(&email("not-an-email")).is_err());
        assert!(mailer.build_message(&email("bob@example.com")).is_ok());
    }
}
