//! Admin authentication against the hosted auth service

mod session;
mod types;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetch::Fetch;

pub use session::*;
pub use types::*;

/// Answers "who is signed in" for the admin area
#[async_trait]
pub trait SessionGuard: Send + Sync {
    /// The signed-in administrator, if any
    fn current_admin(&self) -> Option<AdminIdentity>;

    /// Ends the session. Local state is cleared even if the server call fails.
    async fn sign_out(&self) -> Result<()>;

    fn is_authenticated(&self) -> bool {
        self.current_admin().is_some()
    }
}

/// Client for the auth endpoints. Clones share one session.
#[derive(Debug, Clone)]
pub struct Auth {
    url: String,
    key: String,
    client: Client,
    timeout: Duration,
    session: Arc<Mutex<Option<Session>>>,
}

impl Auth {
    pub fn new(url: &str, key: &str, client: Client, timeout: Duration) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            timeout,
            session: Arc::new(Mutex::new(None)),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sign in with email and password, keeping the session in memory
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.auth_url("/token?grant_type=password");
        let result = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)?
            .timeout(Some(self.timeout))
            .json(&SignInCredentials { email, password })?
            .execute::<Session>()
            .await;

        let session = match result {
            Ok(session) => session.stamped(),
            Err(Error::Api { status, message }) => {
                let reason = serde_json::from_str::<AuthErrorBody>(&message)
                    .ok()
                    .and_then(AuthErrorBody::reason)
                    .unwrap_or(message);
                warn!("sign-in rejected ({}): {}", status, reason);
                return Err(Error::auth(reason));
            }
            Err(e) => return Err(e),
        };

        info!("signed in as {}", session.user.email.as_deref().unwrap_or("?"));
        *self.slot() = Some(session.clone());
        Ok(session)
    }

    /// The current session, unless it has expired
    pub fn get_session(&self) -> Option<Session> {
        self.slot().clone().filter(|s| !s.is_expired())
    }

    pub fn access_token(&self) -> Option<String> {
        self.get_session().map(|s| s.access_token)
    }

    pub fn set_session(&self, session: Session) {
        *self.slot() = Some(session);
    }
}

#[async_trait]
impl SessionGuard for Auth {
    fn current_admin(&self) -> Option<AdminIdentity> {
        self.get_session().map(|s| AdminIdentity::from_user(&s.user))
    }

    async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.slot().take() else {
            return Ok(());
        };

        let url = self.auth_url("/logout");
        let result = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)?
            .bearer_auth(&session.access_token)?
            .timeout(Some(self.timeout))
            .execute_no_content()
            .await;
        match result {
            Ok(()) => {
                info!("signed out");
                Ok(())
            }
            Err(e) => {
                warn!("sign-out request failed, local session cleared anyway: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body() -> serde_json::Value {
        json!({
            "access_token": "jwt-token",
            "refresh_token": "refresh",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {
                "id": "u1",
                "email": "admin@clinic.example",
                "user_metadata": {"name": "Front Desk"}
            }
        })
    }

    fn auth(server: &MockServer) -> Auth {
        Auth::new(&server.uri(), "anon", Client::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn sign_in_stores_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon"))
            .and(body_json(json!({"email": "admin@clinic.example", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let auth = auth(&server);
        assert!(auth.current_admin().is_none());

        auth.sign_in_with_password("admin@clinic.example", "pw")
            .await
            .unwrap();
        assert_eq!(auth.access_token().as_deref(), Some("jwt-token"));
        assert_eq!(
            auth.current_admin(),
            Some(AdminIdentity {
                name: "Front Desk".into(),
                email: "admin@clinic.example".into()
            })
        );
    }

    #[tokio::test]
    async fn bad_credentials_are_auth_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let auth = auth(&server);
        match auth.sign_in_with_password("admin@clinic.example", "nope").await {
            Err(Error::Auth(msg)) => assert_eq!(msg, "Invalid login credentials"),
            other => panic!("expected Auth error, got {:?}", other),
        }
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("Authorization", "Bearer jwt-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let auth = auth(&server);
        auth.sign_in_with_password("admin@clinic.example", "pw")
            .await
            .unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.current_admin().is_none());
        // second sign-out has nothing to do
        auth.sign_out().await.unwrap();
    }
}
