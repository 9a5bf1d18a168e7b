use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::{insert_row, FormStatus, StatusCell};
use crate::config::ClientOptions;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::{ContactDraft, ContactMessage, Resource, Validate};

/// How long the success banner shows before the form is back to editing
pub const CONTACT_BANNER_DELAY: Duration = Duration::from_secs(5);

pub const CONTACT_FAILED: &str = "Failed to send message. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ContactFields {
    pub fn to_draft(&self) -> ContactDraft {
        let phone = self.phone.trim();
        ContactDraft {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
            message: self.message.trim().to_string(),
        }
    }
}

/// Contact form on the public site
pub struct ContactForm {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
    pub fields: ContactFields,
    status: StatusCell,
}

impl ContactForm {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            timeout: ClientOptions::default().request_timeout,
            fields: ContactFields::default(),
            status: StatusCell::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn status(&self) -> FormStatus {
        self.status.get()
    }

    pub fn watch(&self) -> watch::Receiver<FormStatus> {
        self.status.watch()
    }

    pub fn edit(&mut self) {
        self.status.set(FormStatus::Editing);
    }

    /// Validates and inserts one message. On success the fields are cleared
    /// and the banner shows until [`CONTACT_BANNER_DELAY`] has passed.
    pub async fn submit(&mut self) -> Result<()> {
        let draft = self.fields.to_draft();
        draft.validate()?;

        let _submitting = self.status.submitting();
        let result = insert_row(self.gateway.as_ref(), ContactMessage::TABLE, &draft, self.timeout).await;
        match result {
            Ok(()) => {
                self.fields = ContactFields::default();
                self.status.set(FormStatus::Submitted);
                self.status.after(CONTACT_BANNER_DELAY, FormStatus::Editing);
                Ok(())
            }
            Err(e) => {
                warn!("contact message from {} not saved", draft.email);
                self.status.set(FormStatus::Failed(CONTACT_FAILED.to_string()));
                Err(e)
            }
        }
    }
}
