use chrono::{Local, NaiveDate};
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::{insert_row, FormStatus, StatusCell};
use crate::config::ClientOptions;
use crate::error::{Error, Result, ValidationError};
use crate::gateway::Gateway;
use crate::models::{
    Appointment, AppointmentDraft, AppointmentStatus, Reason, Resource, TimeSlot, Validate,
};

/// How long the confirmation stays up before the form closes itself
pub const BOOKING_DISMISS_DELAY: Duration = Duration::from_secs(3);

pub const BOOKING_FAILED: &str = "Failed to book appointment. Please try again.";

/// Raw values as typed into the booking form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFields {
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    /// `YYYY-MM-DD`
    pub preferred_date: String,
    pub preferred_time: String,
    pub reason: String,
    pub notes: String,
}

impl BookingFields {
    /// Checks every field and builds the row to insert
    pub fn to_draft(&self) -> Result<AppointmentDraft> {
        let mut v = ValidationError::new();
        v.require("patient_name", &self.patient_name)
            .require("patient_email", &self.patient_email)
            .require("patient_phone", &self.patient_phone)
            .require("preferred_date", &self.preferred_date)
            .require("preferred_time", &self.preferred_time)
            .require("reason", &self.reason);

        let date = NaiveDate::parse_from_str(self.preferred_date.trim(), "%Y-%m-%d").ok();
        if date.is_none() && !self.preferred_date.trim().is_empty() {
            v.invalid("preferred_date");
        }
        let slot = TimeSlot::parse(&self.preferred_time);
        if slot.is_none() && !self.preferred_time.trim().is_empty() {
            v.invalid("preferred_time");
        }
        let reason = Reason::parse(&self.reason);
        if reason.is_none() && !self.reason.trim().is_empty() {
            v.invalid("reason");
        }

        match (date, slot, reason) {
            (Some(preferred_date), Some(preferred_time), Some(reason)) if v.is_empty() => {
                let notes = self.notes.trim();
                Ok(AppointmentDraft {
                    patient_name: self.patient_name.trim().to_string(),
                    patient_email: self.patient_email.trim().to_string(),
                    patient_phone: self.patient_phone.trim().to_string(),
                    preferred_date,
                    preferred_time,
                    reason,
                    notes: (!notes.is_empty()).then(|| notes.to_string()),
                    status: AppointmentStatus::Pending,
                })
            }
            _ => Err(Error::Validation(v)),
        }
    }
}

/// Appointment request form on the public site
pub struct BookingForm {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
    pub fields: BookingFields,
    status: StatusCell,
}

impl BookingForm {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            timeout: ClientOptions::default().request_timeout,
            fields: BookingFields::default(),
            status: StatusCell::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum offered by the date picker. Not enforced on submit.
    pub fn earliest_date() -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn status(&self) -> FormStatus {
        self.status.get()
    }

    pub fn watch(&self) -> watch::Receiver<FormStatus> {
        self.status.watch()
    }

    /// Back to editing, e.g. after the user dismissed an error
    pub fn edit(&mut self) {
        self.status.set(FormStatus::Editing);
    }

    /// Validates, inserts one pending appointment and schedules the dismissal.
    ///
    /// A validation failure leaves the status alone and makes no gateway call.
    /// A gateway failure keeps every field value.
    pub async fn submit(&mut self) -> Result<()> {
        let draft = self.fields.to_draft()?;
        draft.validate()?;

        let _submitting = self.status.submitting();
        let result = insert_row(self.gateway.as_ref(), Appointment::TABLE, &draft, self.timeout).await;
        match result {
            Ok(()) => {
                self.status.set(FormStatus::Submitted);
                self.status.after(BOOKING_DISMISS_DELAY, FormStatus::Dismissed);
                Ok(())
            }
            Err(e) => {
                warn!("booking for {} not saved", draft.patient_email);
                self.status.set(FormStatus::Failed(BOOKING_FAILED.to_string()));
                Err(e)
            }
        }
    }
}
