//! Types for authentication

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// User data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    pub email: Option<String>,

    #[serde(default)]
    pub user_metadata: HashMap<String, Value>,

    pub role: Option<String>,

    pub created_at: Option<String>,

    pub last_sign_in_at: Option<String>,
}

/// Sign-in credentials
#[derive(Debug, Serialize)]
pub struct SignInCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Error body returned by the auth endpoints
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthErrorBody {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub msg: Option<String>,
    pub message: Option<String>,
}

impl AuthErrorBody {
    pub fn reason(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Name and email shown in the admin header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub name: String,
    pub email: String,
}

impl AdminIdentity {
    /// Display name from `name`/`full_name` metadata, else the email's local part
    pub fn from_user(user: &User) -> Self {
        let email = user.email.clone().unwrap_or_default();
        let name = ["name", "full_name"]
            .iter()
            .filter_map(|key| user.user_metadata.get(*key))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        Self { name, email }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(meta: Value) -> User {
        serde_json::from_value(json!({
            "id": "u1",
            "email": "dr.patel@clinic.example",
            "user_metadata": meta
        }))
        .unwrap()
    }

    #[test]
    fn identity_prefers_metadata_name() {
        let id = AdminIdentity::from_user(&user(json!({"full_name": "Asha Patel"})));
        assert_eq!(id.name, "Asha Patel");
        assert_eq!(id.email, "dr.patel@clinic.example");
    }

    #[test]
    fn identity_falls_back_to_email() {
        let id = AdminIdentity::from_user(&user(json!({"name": "  "})));
        assert_eq!(id.name, "dr.patel");
    }
}
