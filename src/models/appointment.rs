use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Resource, SyncPolicy, Validate};
use crate::error::{Error, Result, ValidationError};
use crate::gateway::{Order, RowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => {
                let mut v = ValidationError::new();
                v.invalid("status");
                Err(v.into())
            }
        }
    }
}

/// Bookable start times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "09:00 AM")]
    NineAm,
    #[serde(rename = "10:00 AM")]
    TenAm,
    #[serde(rename = "11:00 AM")]
    ElevenAm,
    #[serde(rename = "12:00 PM")]
    Noon,
    #[serde(rename = "02:00 PM")]
    TwoPm,
    #[serde(rename = "03:00 PM")]
    ThreePm,
    #[serde(rename = "04:00 PM")]
    FourPm,
    #[serde(rename = "05:00 PM")]
    FivePm,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 8] = [
        TimeSlot::NineAm,
        TimeSlot::TenAm,
        TimeSlot::ElevenAm,
        TimeSlot::Noon,
        TimeSlot::TwoPm,
        TimeSlot::ThreePm,
        TimeSlot::FourPm,
        TimeSlot::FivePm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::NineAm => "09:00 AM",
            TimeSlot::TenAm => "10:00 AM",
            TimeSlot::ElevenAm => "11:00 AM",
            TimeSlot::Noon => "12:00 PM",
            TimeSlot::TwoPm => "02:00 PM",
            TimeSlot::ThreePm => "03:00 PM",
            TimeSlot::FourPm => "04:00 PM",
            TimeSlot::FivePm => "05:00 PM",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

/// Visit categories offered on the booking form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    #[serde(rename = "Eye Exam")]
    EyeExam,
    #[serde(rename = "Contact Lenses")]
    ContactLenses,
    Glasses,
    #[serde(rename = "LASIK")]
    Lasik,
    #[serde(rename = "Medical Issue")]
    MedicalIssue,
    #[serde(rename = "Follow-up")]
    FollowUp,
    Other,
}

impl Reason {
    pub const ALL: [Reason; 7] = [
        Reason::EyeExam,
        Reason::ContactLenses,
        Reason::Glasses,
        Reason::Lasik,
        Reason::MedicalIssue,
        Reason::FollowUp,
        Reason::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Reason::EyeExam => "Eye Exam",
            Reason::ContactLenses => "Contact Lenses",
            Reason::Glasses => "Glasses",
            Reason::Lasik => "LASIK",
            Reason::MedicalIssue => "Medical Issue",
            Reason::FollowUp => "Follow-up",
            Reason::Other => "Other",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.iter().copied().find(|r| r.label() == label)
    }
}

/// Stored booking request. Time and reason are kept as stored text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: RowId,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: String,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// New booking as inserted by the public form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentDraft {
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeSlot,
    pub reason: Reason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

impl Validate for AppointmentDraft {
    fn validate(&self) -> Result<()> {
        let mut v = ValidationError::new();
        v.require("patient_name", &self.patient_name)
            .require("patient_email", &self.patient_email)
            .require("patient_phone", &self.patient_phone);
        v.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusPatch {
    pub status: AppointmentStatus,
}

impl Resource for Appointment {
    const TABLE: &'static str = "appointments";
    const SYNC_POLICY: SyncPolicy = SyncPolicy::PatchInPlace;
    type Draft = AppointmentDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::desc("created_at")
    }
}
