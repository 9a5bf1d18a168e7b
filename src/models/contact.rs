use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Resource, Validate};
use crate::error::{Result, ValidationError};
use crate::gateway::{Order, RowId};

/// Message left through the public contact form. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: RowId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub message: String,
}

impl Validate for ContactDraft {
    fn validate(&self) -> Result<()> {
        let mut v = ValidationError::new();
        v.require("name", &self.name)
            .require("email", &self.email)
            .require("message", &self.message);
        v.into_result()
    }
}

impl Resource for ContactMessage {
    const TABLE: &'static str = "contact_messages";
    type Draft = ContactDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::desc("created_at")
    }
}
