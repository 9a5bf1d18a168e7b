use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{null_as_default, Resource, Validate};
use crate::error::{Result, ValidationError};
use crate::gateway::{Order, RowId};

/// Free-form key/value pair shown on the public site (phone, address, hours...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicSetting {
    pub id: RowId,
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingDraft {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl SettingDraft {
    /// Key and value are stored trimmed
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
            updated_at: Utc::now(),
        }
    }
}

impl Validate for SettingDraft {
    fn validate(&self) -> Result<()> {
        let mut v = ValidationError::new();
        v.require("key", &self.key).require("value", &self.value);
        v.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingValuePatch {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl Resource for ClinicSetting {
    const TABLE: &'static str = "clinic_info";
    type Draft = SettingDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::desc("updated_at")
    }
}

/// Settings as a lookup table. With duplicate keys the first row in `settings` wins.
pub fn settings_map(settings: &[ClinicSetting]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for s in settings {
        map.entry(s.key.clone()).or_insert_with(|| s.value.clone());
    }
    map
}
