//! In-process gateway for tests and offline tooling
//!
//! Tables are vectors of JSON objects. Inserted rows get an integer `id` and a
//! strictly increasing `created_at` unless they bring their own. Every call is
//! logged, and calls can be made to fail or to stall on demand.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use log::debug;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{ChangeFeed, ChangeKind, ChangeNotice, Gateway, Query, RowId};
use crate::error::{Error, Result};

/// Gateway operation, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Count,
    Insert,
    Update,
    Delete,
    Subscribe,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: Op,
    pub table: String,
    pub id: Option<RowId>,
}

#[derive(Debug, Clone)]
struct Failure {
    op: Op,
    table: Option<String>,
    // matching calls still allowed through
    skip: usize,
}

type Subscribers = HashMap<String, Vec<(u64, mpsc::UnboundedSender<ChangeNotice>)>>;

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Map<String, Value>>>,
    next_id: HashMap<String, i64>,
    last_stamp: Option<DateTime<Utc>>,
    failures: Vec<Failure>,
    delays: HashMap<Op, Duration>,
    calls: Vec<Call>,
    subscribers: Subscribers,
    next_subscriber: u64,
}

impl State {
    fn stamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + ChronoDuration::milliseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn next_id(&mut self, table: &str) -> i64 {
        let rows = self.tables.get(table);
        let counter = self.next_id.entry(table.to_string()).or_insert_with(|| {
            rows.map(|rows| {
                rows.iter()
                    .filter_map(|r| r.get("id").and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
        });
        *counter += 1;
        *counter
    }

    fn store(&mut self, table: &str, row: Value) -> Result<Map<String, Value>> {
        let Value::Object(mut row) = row else {
            return Err(Error::gateway(format!("{}: rows must be JSON objects", table)));
        };
        if row.get("id").map_or(true, Value::is_null) {
            let id = self.next_id(table);
            row.insert("id".to_string(), Value::from(id));
        }
        if row.get("created_at").map_or(true, Value::is_null) {
            let stamp = self.stamp();
            row.insert("created_at".to_string(), Value::from(stamp));
        }
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    /// Records the call and returns the injected failure, if one applies
    fn enter(&mut self, op: Op, table: &str, id: Option<&RowId>) -> Result<()> {
        self.calls.push(Call {
            op,
            table: table.to_string(),
            id: id.cloned(),
        });
        let hit = self.failures.iter_mut().find(|f| {
            f.op == op && f.table.as_deref().map_or(true, |t| t == table)
        });
        match hit {
            Some(failure) if failure.skip > 0 => {
                failure.skip -= 1;
                Ok(())
            }
            Some(_) => Err(Error::gateway(format!("injected {:?} failure on {}", op, table))),
            None => Ok(()),
        }
    }

    fn notify(&mut self, table: &str, kind: ChangeKind) {
        if let Some(subscribers) = self.subscribers.get_mut(table) {
            subscribers.retain(|(_, tx)| {
                tx.send(ChangeNotice {
                    table: table.to_string(),
                    kind,
                })
                .is_ok()
            });
        }
    }
}

/// Gateway holding its tables in memory. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<State>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds rows without logging a call or notifying subscribers
    pub fn seed(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        let mut state = self.state();
        for row in rows {
            state.store(table, row)?;
        }
        Ok(())
    }

    /// Current contents of `table`, in storage order
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state()
            .tables
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Every later `op` call (on `table`, or on any table when `None`) fails
    pub fn fail(&self, op: Op, table: Option<&str>) {
        self.fail_after(op, table, 0);
    }

    /// Lets `skip` matching calls through, then fails the rest
    pub fn fail_after(&self, op: Op, table: Option<&str>, skip: usize) {
        self.state().failures.push(Failure {
            op,
            table: table.map(str::to_string),
            skip,
        });
    }

    /// Removes all injected failures
    pub fn heal(&self) {
        self.state().failures.clear();
    }

    /// Makes every `op` call wait `delay` before doing anything
    pub fn delay(&self, op: Op, delay: Duration) {
        self.state().delays.insert(op, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.state().calls.iter().filter(|c| c.op == op).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        self.state()
            .subscribers
            .get(table)
            .map(|s| s.iter().filter(|(_, tx)| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Pushes a notice as if another client had changed `table`
    pub fn notify(&self, table: &str, kind: ChangeKind) {
        self.state().notify(table, kind);
    }

    async fn pause(&self, op: Op) {
        let delay = self.state().delays.get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    // nulls sort after everything else
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn project(row: &Map<String, Value>, columns: &Option<Vec<String>>) -> Value {
    match columns {
        Some(columns) if !columns.is_empty() => Value::Object(
            columns
                .iter()
                .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                .collect(),
        ),
        _ => Value::Object(row.clone()),
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        self.pause(Op::Select).await;
        let mut state = self.state();
        state.enter(Op::Select, table, None)?;

        let mut rows: Vec<&Map<String, Value>> = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters
                            .iter()
                            .all(|(column, value)| row.get(column) == Some(value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows.into_iter().map(|r| project(r, &query.columns)).collect())
    }

    async fn count(&self, table: &str) -> Result<u64> {
        self.pause(Op::Count).await;
        let mut state = self.state();
        state.enter(Op::Count, table, None)?;
        Ok(state.tables.get(table).map_or(0, |rows| rows.len() as u64))
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        self.pause(Op::Insert).await;
        let mut state = self.state();
        state.enter(Op::Insert, table, None)?;

        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            stored.push(Value::Object(state.store(table, row)?));
        }
        debug!("memory: inserted {} row(s) into {}", stored.len(), table);
        state.notify(table, ChangeKind::Insert);
        Ok(stored)
    }

    async fn update(&self, table: &str, id: &RowId, patch: Value) -> Result<()> {
        self.pause(Op::Update).await;
        let mut state = self.state();
        state.enter(Op::Update, table, Some(id))?;

        let Value::Object(patch) = patch else {
            return Err(Error::gateway(format!("{}: patch must be a JSON object", table)));
        };
        let mut touched = false;
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows
                .iter_mut()
                .filter(|r| r.get("id").map_or(false, |v| id.matches(v)))
            {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                touched = true;
            }
        }
        if touched {
            state.notify(table, ChangeKind::Update);
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &RowId) -> Result<()> {
        self.pause(Op::Delete).await;
        let mut state = self.state();
        state.enter(Op::Delete, table, Some(id))?;

        let removed = match state.tables.get_mut(table) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|r| !r.get("id").map_or(false, |v| id.matches(v)));
                before != rows.len()
            }
            None => false,
        };
        if removed {
            state.notify(table, ChangeKind::Delete);
        }
        Ok(())
    }

    async fn subscribe(&self, table: &str) -> Result<ChangeFeed> {
        self.pause(Op::Subscribe).await;
        let mut state = self.state();
        state.enter(Op::Subscribe, table, None)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let key = state.next_subscriber;
        state.next_subscriber += 1;
        state
            .subscribers
            .entry(table.to_string())
            .or_default()
            .push((key, tx));
        drop(state);

        let shared = self.state.clone();
        let table = table.to_string();
        Ok(ChangeFeed::new(rx, move || {
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(subscribers) = state.subscribers.get_mut(&table) {
                subscribers.retain(|(k, _)| *k != key);
            }
        }))
    }
}
