use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{active, null_as_active, null_as_default, Activatable, Ordered, Resource, Validate};
use crate::error::{Result, ValidationError};
use crate::gateway::{Order, RowId};
use crate::icons::ServiceIcon;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: RowId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_order: i32,
    #[serde(default = "active", deserialize_with = "null_as_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Service {
    pub fn icon(&self) -> ServiceIcon {
        ServiceIcon::from_name(&self.icon_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDraft {
    pub title: String,
    pub description: String,
    pub icon_name: String,
    pub display_order: i32,
    pub is_active: bool,
}

impl Default for ServiceDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            icon_name: String::new(),
            display_order: 0,
            is_active: true,
        }
    }
}

impl Validate for ServiceDraft {
    fn validate(&self) -> Result<()> {
        let mut v = ValidationError::new();
        v.require("title", &self.title);
        v.into_result()
    }
}

impl From<&Service> for ServiceDraft {
    fn from(s: &Service) -> Self {
        Self {
            title: s.title.clone(),
            description: s.description.clone(),
            icon_name: s.icon_name.clone(),
            display_order: s.display_order,
            is_active: s.is_active,
        }
    }
}

impl Resource for Service {
    const TABLE: &'static str = "services";
    type Draft = ServiceDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::asc("display_order")
    }
}

impl Ordered for Service {
    fn display_order(&self) -> i32 {
        self.display_order
    }
}

impl Activatable for Service {
    fn is_active(&self) -> bool {
        self.is_active
    }
}
