//! Clinic website and admin panel client
//!
//! Content lives in a hosted Supabase project. The public site reads it
//! through [`site::PublicSite`] and accepts bookings and messages through
//! [`forms`]. Administrators manage every table through [`admin::AdminPanel`].
//! Both sides sit on [`binding::ResourceBinding`], which talks to storage only
//! through the [`gateway::Gateway`] trait.

pub mod admin;
pub mod auth;
pub mod binding;
pub mod config;
pub mod error;
pub mod fetch;
pub mod forms;
pub mod gateway;
pub mod icons;
pub mod models;
pub mod postgrest;
pub mod realtime;
pub mod site;

pub use config::{ClientOptions, ClinicConfig};
pub use error::{Error, ErrorKind, Result, ValidationError};

/// The types most callers need
pub mod prelude {
    pub use crate::admin::{AdminPanel, AdminRoute, Dashboard, DashboardSummary, RouteDecision};
    pub use crate::auth::{AdminIdentity, Auth, SessionGuard};
    pub use crate::binding::{Direction, LiveUpdates, LoadState, ResourceBinding};
    pub use crate::config::{ClientOptions, ClinicConfig};
    pub use crate::error::{Error, ErrorKind, Result, ValidationError};
    pub use crate::forms::{BookingForm, ContactForm, FormStatus};
    pub use crate::gateway::memory::MemoryGateway;
    pub use crate::gateway::supabase::SupabaseGateway;
    pub use crate::gateway::{Gateway, Query, RowId};
    pub use crate::models::*;
    pub use crate::site::PublicSite;
}
