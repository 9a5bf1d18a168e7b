//! Configuration for the clinic content client

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the backend endpoint
pub const URL_VAR: &str = "SUPABASE_URL";
/// Environment variable holding the public API key
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
/// Optional override for the per-call timeout, in seconds
pub const TIMEOUT_VAR: &str = "CLINIC_REQUEST_TIMEOUT_SECS";

/// Configuration options for the client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Upper bound for every gateway call
    pub request_timeout: Duration,

    /// The database schema
    pub db_schema: String,

    /// Interval between realtime heartbeats
    pub heartbeat_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            db_schema: "public".to_string(),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the realtime heartbeat interval
    pub fn with_heartbeat_interval(mut self, value: Duration) -> Self {
        self.heartbeat_interval = value;
        self
    }
}

/// Endpoint and key for the hosted backend.
/// Both values must be present at startup.
#[derive(Debug, Clone)]
pub struct ClinicConfig {
    pub url: Url,
    pub anon_key: String,
    pub options: ClientOptions,
}

impl ClinicConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url_str: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url_str)
            .map_err(|e| Error::config(format!("invalid {}: {}", URL_VAR, e)))?;
        if anon_key.trim().is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            options: ClientOptions::default(),
        })
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClinicConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::config(format!("{} environment variable not found", URL_VAR)))?;
        let key = lookup(ANON_KEY_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!("{} environment variable not found", ANON_KEY_VAR))
            })?;

        let mut config = Self::new(&url, &key)?;
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{} must be a number of seconds", TIMEOUT_VAR)))?;
            config.options = config
                .options
                .with_request_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Base URL without a trailing slash, as the REST and auth paths expect
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn config_new_valid() {
        let config = ClinicConfig::new("http://localhost:54321", "dummy-anon-key").unwrap();
        assert_eq!(config.url.to_string(), "http://localhost:54321/");
        assert_eq!(config.base_url(), "http://localhost:54321");
        assert_eq!(config.options.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_new_invalid_url() {
        let err = ClinicConfig::new("not a valid url", "key").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn config_new_empty_key() {
        match ClinicConfig::new("http://localhost:54321", "") {
            Err(Error::Config(msg)) => assert!(msg.contains("anon_key cannot be empty")),
            other => panic!("Expected Config error for empty key, got {:?}", other),
        }
    }

    #[test]
    fn missing_url_is_config_error() {
        let err = ClinicConfig::from_lookup(lookup(&[(ANON_KEY_VAR, "k")])).unwrap_err();
        assert!(err.to_string().contains(URL_VAR));
    }

    #[test]
    fn missing_key_is_config_error() {
        let err =
            ClinicConfig::from_lookup(lookup(&[(URL_VAR, "https://x.supabase.co")])).unwrap_err();
        assert!(err.to_string().contains(ANON_KEY_VAR));
    }

    #[test]
    fn timeout_override() {
        let config = ClinicConfig::from_lookup(lookup(&[
            (URL_VAR, "https://x.supabase.co"),
            (ANON_KEY_VAR, "k"),
            (TIMEOUT_VAR, "5"),
        ]))
        .unwrap();
        assert_eq!(config.options.request_timeout, Duration::from_secs(5));

        let bad = ClinicConfig::from_lookup(lookup(&[
            (URL_VAR, "https://x.supabase.co"),
            (ANON_KEY_VAR, "k"),
            (TIMEOUT_VAR, "soon"),
        ]));
        assert!(bad.is_err());
    }
}
