//! The remote data gateway seen by bindings, forms and the dashboard
//!
//! [`Gateway`] is the only way the rest of the crate talks to storage.
//! [`supabase::SupabaseGateway`] speaks to the hosted backend and
//! [`memory::MemoryGateway`] keeps tables in process.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

use crate::error::Result;

pub use crate::realtime::{ChangeKind, PostgresChange as ChangeNotice};

/// Row identifier. The backend uses integer keys for some tables and uuids for others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl RowId {
    pub fn to_value(&self) -> Value {
        match self {
            RowId::Int(i) => Value::from(*i),
            RowId::Text(s) => Value::from(s.as_str()),
        }
    }

    /// Whether `value` (a row's `id` column) names this row
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (RowId::Int(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (RowId::Int(i), Value::String(s)) => s.parse::<i64>().ok() == Some(*i),
            (RowId::Text(t), Value::String(s)) => t == s,
            (RowId::Text(t), Value::Number(n)) => n.to_string() == *t,
            _ => false,
        }
    }

    /// Integers stay integers, anything else is kept as text
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(RowId::Int)
            .unwrap_or_else(|_| RowId::Text(raw.trim().to_string()))
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(i) => f.pad(&i.to_string()),
            RowId::Text(s) => f.pad(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId::Int(value)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId::Text(value)
    }
}

/// Sort key for a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// What a select asks for: equality filters, one ordering, optional projection and limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub columns: Option<Vec<String>>,
    pub filters: Vec<(String, Value)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    /// Every column of every row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The `select=` clause
    pub fn select_clause(&self) -> String {
        match &self.columns {
            Some(columns) if !columns.is_empty() => columns.join(","),
            _ => "*".to_string(),
        }
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Payload-free change notices for one table. Closing or dropping it releases the channel.
pub struct ChangeFeed {
    receiver: mpsc::UnboundedReceiver<ChangeNotice>,
    release: Option<Release>,
}

impl ChangeFeed {
    pub fn new<F>(receiver: mpsc::UnboundedReceiver<ChangeNotice>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Next notice, or `None` once the feed is closed
    pub async fn next(&mut self) -> Option<ChangeNotice> {
        self.receiver.recv().await
    }

    pub fn close(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        self.receiver.close();
    }

    pub fn is_closed(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Typed access to the hosted tables
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Rows of `table` matching `query`
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    /// Row count of `table`, without fetching rows
    async fn count(&self, table: &str) -> Result<u64>;

    /// Inserts `rows` and returns them as stored
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>>;

    /// Applies `patch` to the row with `id`
    async fn update(&self, table: &str, id: &RowId, patch: Value) -> Result<()>;

    async fn delete(&self, table: &str, id: &RowId) -> Result<()>;

    /// Opens a change feed scoped to `table`
    async fn subscribe(&self, table: &str) -> Result<ChangeFeed>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn row_ids() {
        assert_eq!(RowId::parse("42"), RowId::Int(42));
        assert_eq!(
            RowId::parse("6f1c0a4e-0000-4000-8000-000000000000"),
            RowId::Text("6f1c0a4e-0000-4000-8000-000000000000".into())
        );
        assert!(RowId::Int(3).matches(&json!(3)));
        assert!(!RowId::Int(3).matches(&json!("three")));
        assert_eq!(serde_json::from_value::<RowId>(json!("ab")).unwrap(), RowId::from("ab"));
        assert_eq!(RowId::from(5).to_string(), "5");
    }

    #[test]
    fn query_select_clause() {
        assert_eq!(Query::all().select_clause(), "*");
        let q = Query::all()
            .columns(&["id", "title"])
            .eq("is_active", true)
            .order_by(Order::asc("display_order"));
        assert_eq!(q.select_clause(), "id,title");
        assert_eq!(q.filters, vec![("is_active".to_string(), json!(true))]);
    }

    #[test]
    fn feed_releases_once() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut feed = ChangeFeed::new(rx, move || {
            assert!(!flag.swap(true, Ordering::SeqCst));
        });
        feed.close();
        assert!(feed.is_closed());
        drop(feed);
        assert!(released.load(Ordering::SeqCst));
    }
}
