//! Session held after a password sign-in

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::types::User;

/// Session data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    pub refresh_token: String,

    pub token_type: String,

    /// Lifetime in seconds
    pub expires_in: i64,

    /// Expiry as a unix timestamp
    pub expires_at: Option<i64>,

    pub user: User,
}

impl Session {
    /// Fills in `expires_at` when the server left it out
    pub(crate) fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }
}
