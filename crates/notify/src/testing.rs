//! In-memory mailer for tests.

use std::sync::Mutex;

use crate::traits::{Mailer, NotifyError, OutgoingEmail};

/// Records every email instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Smtp("recorder poisoned".into()))?
            .push(email.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}
