use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{active, null_as_active, null_as_default, Activatable, Ordered, Resource, Validate};
use crate::error::{Result, ValidationError};
use crate::gateway::{Order, RowId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: RowId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub qualification: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_order: i32,
    #[serde(default = "active", deserialize_with = "null_as_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorDraft {
    pub name: String,
    pub title: String,
    pub qualification: String,
    pub description: String,
    pub display_order: i32,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for DoctorDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            title: String::new(),
            qualification: String::new(),
            description: String::new(),
            display_order: 0,
            is_active: true,
            updated_at: None,
        }
    }
}

impl DoctorDraft {
    /// Edit payload for `doctor`, stamped with the edit time
    pub fn edit_of(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            title: doctor.title.clone(),
            qualification: doctor.qualification.clone(),
            description: doctor.description.clone(),
            display_order: doctor.display_order,
            is_active: doctor.is_active,
            updated_at: Some(Utc::now()),
        }
    }
}

impl Validate for DoctorDraft {
    fn validate(&self) -> Result<()> {
        let mut v = ValidationError::new();
        v.require("name", &self.name);
        v.into_result()
    }
}

impl Resource for Doctor {
    const TABLE: &'static str = "doctors";
    type Draft = DoctorDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::asc("display_order")
    }
}

impl Ordered for Doctor {
    fn display_order(&self) -> i32 {
        self.display_order
    }
}

impl Activatable for Doctor {
    fn is_active(&self) -> bool {
        self.is_active
    }
}
