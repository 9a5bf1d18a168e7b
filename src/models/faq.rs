use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{active, null_as_active, null_as_default, Activatable, Ordered, Resource, Validate};
use crate::error::{Result, ValidationError};
use crate::gateway::{Order, RowId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub id: RowId,
    pub question: String,
    pub answer: String,
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
pub struct FaqDraft {
    pub question: String,
    pub answer: String,
    pub display_order: i32,
    pub is_active: bool,
}

impl FaqDraft {
    pub fn new(question: &str, answer: &str, display_order: i32) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
            display_order,
            is_active: true,
        }
    }
}

impl Validate for FaqDraft {
    fn validate(&self) -> Result<()> {
        let mut v = ValidationError::new();
        v.require("question", &self.question)
            .require("answer", &self.answer);
        v.into_result()
    }
}

/// Question/answer edit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqEdit {
    pub question: String,
    pub answer: String,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Faq {
    const TABLE: &'static str = "faqs";
    type Draft = FaqDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::asc("display_order")
    }
}

impl Ordered for Faq {
    fn display_order(&self) -> i32 {
        self.display_order
    }
}

impl Activatable for Faq {
    fn is_active(&self) -> bool {
        self.is_active
    }
}
