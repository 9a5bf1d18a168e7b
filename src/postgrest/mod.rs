//! Table operations through the PostgREST API

mod filter;
mod query;
mod types;

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub use filter::*;
pub use query::*;
pub use types::*;

/// Client for one table
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    ctx: RequestContext,
}

impl PostgrestClient {
    /// Create a new PostgrestClient for `table` under `url`
    pub fn new(url: &str, key: &str, table: &str, client: Client) -> Self {
        Self {
            ctx: RequestContext {
                url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
                key: key.to_string(),
                token: None,
                client,
                timeout: None,
            },
        }
    }

    /// Send requests with the user's access token instead of the anon key
    pub fn with_auth(mut self, token: &str) -> Self {
        self.ctx.token = Some(token.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.ctx.timeout = Some(timeout);
        self
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.ctx.clone(), columns)
    }

    /// Insert rows into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.ctx.clone(), values)
    }

    /// Update rows in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.ctx.clone(), values)
    }

    /// Delete rows from the table
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.ctx.clone())
    }

    /// Count all rows in the table
    pub fn count(&self) -> CountBuilder {
        CountBuilder::new(self.ctx.clone())
    }
}
