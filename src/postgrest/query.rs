//! Request builders for PostgrestClient

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::*;
use crate::postgrest::types::*;

/// Connection details shared by every builder of one client
#[derive(Debug, Clone)]
pub(crate) struct RequestContext {
    pub url: String,
    pub key: String,
    pub token: Option<String>,
    pub client: Client,
    pub timeout: Option<Duration>,
}

impl RequestContext {
    /// Adds the key, bearer token and timeout to a request
    fn prepare<'a>(&self, fetch: FetchBuilder<'a>) -> Result<FetchBuilder<'a>, Error> {
        let token = self.token.as_deref().unwrap_or(&self.key);
        Ok(fetch
            .header("apikey", &self.key)?
            .bearer_auth(token)?
            .timeout(self.timeout))
    }
}

/// Ordered query-string parameters
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing an earlier one with the same key
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Add a filter on `column`
    pub fn add_filter(&mut self, column: &str, op: FilterOperator, value: &Value) {
        self.add_param(column, &op.encode(value));
    }

    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    ctx: RequestContext,
    query: QueryBuilder,
}

impl SelectBuilder {
    pub(crate) fn new(ctx: RequestContext, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);
        Self { ctx, query }
    }

    /// Filter rows where column equals a value
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.query.add_filter(column, FilterOperator::Eq, &value.into());
        self
    }

    /// Filter with an arbitrary operator
    pub fn filter(mut self, column: &str, op: FilterOperator, value: impl Into<Value>) -> Self {
        self.query.add_filter(column, op, &value.into());
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query
            .add_param("order", &format!("{}.{}", column, order.as_str()));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: usize) -> Self {
        self.query.add_param("limit", &count.to_string());
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        self.query.get_params()
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        let fetch = Fetch::get(&self.ctx.client, &self.ctx.url).query(self.query.get_params());
        self.ctx.prepare(fetch)?.execute::<Vec<T>>().await
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    ctx: RequestContext,
    values: T,
    returning: ReturnOption,
}

impl<T: Serialize> InsertBuilder<T> {
    pub(crate) fn new(ctx: RequestContext, values: T) -> Self {
        Self {
            ctx,
            values,
            returning: ReturnOption::Representation,
        }
    }

    /// Choose whether the inserted rows come back
    pub fn returning(mut self, option: ReturnOption) -> Self {
        self.returning = option;
        self
    }

    /// Execute the insert and return the stored rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        let fetch = Fetch::post(&self.ctx.client, &self.ctx.url)
            .header("Prefer", self.returning.as_header())?
            .json(&self.values)?;
        let fetch = self.ctx.prepare(fetch)?;
        match self.returning {
            ReturnOption::Representation => fetch.execute::<Vec<R>>().await,
            ReturnOption::Minimal => {
                fetch.execute_no_content().await?;
                Ok(Vec::new())
            }
        }
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    ctx: RequestContext,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(ctx: RequestContext, values: T) -> Self {
        Self {
            ctx,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.query.add_filter(column, FilterOperator::Eq, &value.into());
        self
    }

    /// Execute the update
    pub async fn execute(&self) -> Result<(), Error> {
        if self.query.get_params().is_empty() {
            return Err(Error::gateway("refusing to update without a filter"));
        }
        let fetch = Fetch::patch(&self.ctx.client, &self.ctx.url)
            .query(self.query.get_params())
            .header("Prefer", ReturnOption::Minimal.as_header())?
            .json(&self.values)?;
        self.ctx.prepare(fetch)?.execute_no_content().await
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    ctx: RequestContext,
    query: QueryBuilder,
}

impl DeleteBuilder {
    pub(crate) fn new(ctx: RequestContext) -> Self {
        Self {
            ctx,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.query.add_filter(column, FilterOperator::Eq, &value.into());
        self
    }

    /// Execute the delete
    pub async fn execute(&self) -> Result<(), Error> {
        if self.query.get_params().is_empty() {
            return Err(Error::gateway("refusing to delete without a filter"));
        }
        let fetch = Fetch::delete(&self.ctx.client, &self.ctx.url).query(self.query.get_params());
        self.ctx.prepare(fetch)?.execute_no_content().await
    }
}

/// Exact row count without fetching rows
pub struct CountBuilder {
    ctx: RequestContext,
}

impl CountBuilder {
    pub(crate) fn new(ctx: RequestContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self) -> Result<u64, Error> {
        let fetch = Fetch::head(&self.ctx.client, &self.ctx.url)
            .query(&[("select".to_string(), "*".to_string())])
            .header("Prefer", "count=exact")?;
        let response = self.ctx.prepare(fetch)?.send().await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::gateway("count response carried no Content-Range header"))?;
        parse_content_range(range)
            .ok_or_else(|| Error::gateway(format!("unexpected Content-Range: {}", range)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_keep_order_and_replace() {
        let mut q = QueryBuilder::new();
        q.add_param("select", "*");
        q.add_filter("is_active", FilterOperator::Eq, &json!(true));
        q.add_param("order", "id.asc");
        q.add_param("order", "display_order.asc");
        assert_eq!(
            q.get_params(),
            &[
                ("select".to_string(), "*".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("order".to_string(), "display_order.asc".to_string()),
            ]
        );
    }
}
