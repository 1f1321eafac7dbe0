//! Outgoing email for Examly.
//!
//! This crate provides:
//! - `Mailer` trait with an SMTP implementation and a no-op fallback
//! - Minijinja template for the "material shared" email
//! - `Notifier`, which renders and sends them

pub mod email;
pub mod templating;
pub mod testing;
pub mod traits;

use std::sync::Arc;

use examly_core::config::SmtpConfig;

pub use email::SmtpMailer;
pub use templating::{SharedContext, TemplateRenderer};
pub use traits::{Mailer, NoopMailer, NotifyError, OutgoingEmail};

/// Renders and sends application emails.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    renderer: TemplateRenderer,
    app_url: String,
}

impl Notifier {
    /// SMTP when configured, otherwise a no-op mailer.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let mailer: Arc<dyn Mailer> = if config.is_configured() {
            Arc::new(SmtpMailer::from_config(config)?)
        } else {
            tracing::info!("SMTP not configured; emails will not be sent");
            Arc::new(NoopMailer)
        };
        Self::new(mailer, &config.app_url)
    }

    pub fn new(mailer: Arc<dyn Mailer>, app_url: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            mailer,
            renderer: TemplateRenderer::new()?,
            app_url: app_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.mailer.is_enabled()
    }

    pub async fn material_shared(
        &self,
        to: &str,
        sharer: &str,
        title: &str,
        material_id: &str,
    ) -> Result<(), NotifyError> {
        let ctx = SharedContext {
            sharer: sharer.to_string(),
            title: title.to_string(),
            material_id: material_id.to_string(),
            app_url: self.app_url.clone(),
        };
        let email = self.renderer.material_shared(to, &ctx)?;
        self.mailer.send(&email).await
    }
}
