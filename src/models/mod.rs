//! Typed rows for every table the site and admin panel touch

mod appointment;
mod blog;
mod contact;
mod doctor;
mod faq;
mod service;
mod setting;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::gateway::{Order, RowId};

pub use appointment::*;
pub use blog::*;
pub use contact::*;
pub use doctor::*;
pub use faq::*;
pub use service::*;
pub use setting::*;

/// PostgREST sends `null` for unset nullable columns; read those as the type's default
pub(crate) fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

pub(crate) fn active() -> bool {
    true
}

/// `is_active` is true when the column is missing or null
pub(crate) fn null_as_active<'de, D>(d: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(d).map(|v| v.unwrap_or(true))
}

/// How a binding reconciles its local collection after a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Re-fetch the whole collection
    Reload,
    /// Merge the patch into the local row; drop the row locally on delete
    PatchInPlace,
}

/// Local required-field check run before any insert
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// A row type bound to one table
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const SYNC_POLICY: SyncPolicy = SyncPolicy::Reload;

    /// What `create` inserts
    type Draft: Serialize + Validate + Send + Sync;

    fn id(&self) -> &RowId;

    fn default_order() -> Order;

    /// Column projection; `None` selects every column
    fn columns() -> Option<&'static [&'static str]> {
        None
    }
}

/// Resources shown in admin-chosen order
pub trait Ordered: Resource {
    fn display_order(&self) -> i32;
}

/// Resources that can be hidden from the public site without deleting them
pub trait Activatable: Resource {
    fn is_active(&self) -> bool;
}
