//! Resource binding: fetch a table into a local list, mutate it through the
//! gateway, then bring the list back in line with the table.
//!
//! Every gateway call is bounded by the binding's timeout and aborted by
//! [`ResourceBinding::close`]. A load either replaces the whole list or leaves
//! it untouched.

use chrono::Utc;
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::config::ClientOptions;
use crate::error::{Error, Result, ValidationError};
use crate::gateway::{Gateway, Query, RowId};
use crate::models::{Activatable, Ordered, Resource, SyncPolicy, Validate};

/// Where a binding is in its fetch cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Errored(String),
}

/// Move direction for [`ResourceBinding::reorder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

struct Inner<R> {
    items: Vec<R>,
    state: LoadState,
    last_error: Option<String>,
}

/// Cancellation state shared by a binding and its clones
#[derive(Debug, Clone, Copy, Default)]
struct Signal {
    /// Bumped to abort whatever is in flight
    epoch: u64,
    closed: bool,
}

/// Local view of one table. Clones share the same list and cancellation signal.
pub struct ResourceBinding<R: Resource> {
    gateway: Arc<dyn Gateway>,
    query: Query,
    timeout: Duration,
    inner: Arc<RwLock<Inner<R>>>,
    cancel: Arc<watch::Sender<Signal>>,
}

impl<R: Resource> Clone for ResourceBinding<R> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            query: self.query.clone(),
            timeout: self.timeout,
            inner: self.inner.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<R: Resource> ResourceBinding<R> {
    /// Whole table in the resource's default order
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let mut query = Query::all().order_by(R::default_order());
        if let Some(columns) = R::columns() {
            query = query.columns(columns);
        }
        let (cancel, _) = watch::channel(Signal::default());
        Self {
            gateway,
            query,
            timeout: ClientOptions::default().request_timeout,
            inner: Arc::new(RwLock::new(Inner {
                items: Vec::new(),
                state: LoadState::Idle,
                last_error: None,
            })),
            cancel: Arc::new(cancel),
        }
    }

    /// Only rows where `column` equals `value`
    pub fn with_filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.query = self.query.eq(column, value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub async fn items(&self) -> Vec<R> {
        self.inner.read().await.items.clone()
    }

    pub async fn get(&self, id: &RowId) -> Option<R> {
        self.inner
            .read()
            .await
            .items
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    pub async fn state(&self) -> LoadState {
        self.inner.read().await.state.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.read().await.last_error.clone()
    }

    /// Stops the binding. In-flight and later calls fail with [`Error::Cancelled`].
    pub fn close(&self) {
        self.cancel.send_modify(|s| s.closed = true);
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.borrow().closed
    }

    /// Fails the calls in flight with [`Error::Cancelled`]; later calls run as usual
    pub fn cancel_pending(&self) {
        self.cancel.send_modify(|s| s.epoch += 1);
    }

    /// Runs one gateway call under the timeout and the cancellation signal
    pub(crate) async fn call<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let mut signal = self.cancel.subscribe();
        let start = *signal.borrow_and_update();
        if start.closed {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            _ = signal.wait_for(|s| s.closed || s.epoch != start.epoch) => Err(Error::Cancelled),
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(self.timeout)),
            },
        }
    }

    fn report(&self, action: &str, err: &Error) {
        match err {
            Error::Cancelled => debug!("{} on {} cancelled", action, R::TABLE),
            _ => error!("{} on {} failed: {}", action, R::TABLE, err),
        }
    }

    /// Fetches the full collection and replaces the local one
    pub async fn load(&self) -> Result<Vec<R>> {
        let previous = {
            let mut inner = self.inner.write().await;
            std::mem::replace(&mut inner.state, LoadState::Loading)
        };

        let result = match self.call(self.gateway.select(R::TABLE, &self.query)).await {
            Ok(rows) => rows
                .into_iter()
                .map(serde_json::from_value::<R>)
                .collect::<std::result::Result<Vec<R>, _>>()
                .map_err(Error::from),
            Err(e) => Err(e),
        };

        let mut inner = self.inner.write().await;
        match result {
            Ok(items) => {
                debug!("loaded {} row(s) from {}", items.len(), R::TABLE);
                inner.items = items.clone();
                inner.state = LoadState::Ready;
                inner.last_error = None;
                Ok(items)
            }
            Err(Error::Cancelled) => {
                inner.state = previous;
                Err(Error::Cancelled)
            }
            Err(e) => {
                self.report("load", &e);
                inner.state = LoadState::Errored(e.to_string());
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn remember(&self, err: &Error) {
        if !matches!(err, Error::Cancelled) {
            self.inner.write().await.last_error = Some(err.to_string());
        }
    }

    /// Validates and inserts `draft`, then reloads
    pub async fn create(&self, draft: &R::Draft) -> Result<()> {
        if let Err(e) = draft.validate() {
            warn!("rejected new {} row: {}", R::TABLE, e);
            return Err(e);
        }
        let row = serde_json::to_value(draft)?;
        if let Err(e) = self.call(self.gateway.insert(R::TABLE, vec![row])).await {
            self.report("insert", &e);
            self.remember(&e).await;
            return Err(e);
        }
        self.load().await.map(|_| ())
    }

    /// Applies `patch` to row `id`, then syncs per the resource's policy
    pub async fn update<P: Serialize + ?Sized>(&self, id: &RowId, patch: &P) -> Result<()> {
        let patch = serde_json::to_value(patch)?;
        if let Err(e) = self
            .call(self.gateway.update(R::TABLE, id, patch.clone()))
            .await
        {
            self.report("update", &e);
            self.remember(&e).await;
            return Err(e);
        }
        match R::SYNC_POLICY {
            SyncPolicy::Reload => self.load().await.map(|_| ()),
            SyncPolicy::PatchInPlace => self.patch_local(id, patch).await,
        }
    }

    async fn patch_local(&self, id: &RowId, patch: Value) -> Result<()> {
        let Value::Object(patch) = patch else {
            return Ok(());
        };
        let mut inner = self.inner.write().await;
        for item in inner.items.iter_mut().filter(|r| r.id() == id) {
            let mut merged = serde_json::to_value(&*item)?;
            if let Value::Object(fields) = &mut merged {
                for (key, value) in &patch {
                    fields.insert(key.clone(), value.clone());
                }
            }
            *item = serde_json::from_value(merged)?;
        }
        Ok(())
    }

    /// Deletes row `id`, then syncs per the resource's policy
    pub async fn remove(&self, id: &RowId) -> Result<()> {
        if let Err(e) = self.call(self.gateway.delete(R::TABLE, id)).await {
            self.report("delete", &e);
            self.remember(&e).await;
            return Err(e);
        }
        match R::SYNC_POLICY {
            SyncPolicy::Reload => self.load().await.map(|_| ()),
            SyncPolicy::PatchInPlace => {
                self.inner.write().await.items.retain(|r| r.id() != id);
                Ok(())
            }
        }
    }

    /// Reloads on every change to the table and hands the fresh list to `on_change`
    pub async fn subscribe<F>(&self, on_change: F) -> Result<LiveUpdates>
    where
        F: Fn(Vec<R>) + Send + Sync + 'static,
    {
        let mut feed = match self.call(self.gateway.subscribe(R::TABLE)).await {
            Ok(feed) => feed,
            Err(e) => {
                self.report("subscribe", &e);
                return Err(e);
            }
        };
        debug!("live updates on {} started", R::TABLE);

        let binding = self.clone();
        let task = tokio::spawn(async move {
            while let Some(notice) = feed.next().await {
                debug!("{:?} on {}, reloading", notice.kind, notice.table);
                match binding.load().await {
                    Ok(items) => on_change(items),
                    Err(Error::Cancelled) if binding.is_closed() => break,
                    // already logged by load; keep listening
                    Err(_) => {}
                }
            }
            feed.close();
            debug!("live updates on {} stopped", R::TABLE);
        });
        Ok(LiveUpdates {
            table: R::TABLE,
            task: Some(task),
        })
    }
}

impl<R: Ordered> ResourceBinding<R> {
    /// Swaps `id` with its neighbour in display order, then reloads.
    ///
    /// Returns `false` without touching the gateway when there is nothing to
    /// swap with. The two updates are not atomic: if the second fails the
    /// table is left with both rows at the same position.
    pub async fn reorder(&self, id: &RowId, direction: Direction) -> Result<bool> {
        let (moved, other) = {
            let inner = self.inner.read().await;
            let mut sorted: Vec<&R> = inner.items.iter().collect();
            sorted.sort_by_key(|r| r.display_order());

            let Some(index) = sorted.iter().position(|r| r.id() == id) else {
                return Ok(false);
            };
            let target = match direction {
                Direction::Up => index.checked_sub(1),
                Direction::Down => Some(index + 1).filter(|t| *t < sorted.len()),
            };
            let Some(target) = target else {
                return Ok(false);
            };
            (
                (sorted[index].id().clone(), sorted[index].display_order()),
                (sorted[target].id().clone(), sorted[target].display_order()),
            )
        };

        let first = self.gateway.update(R::TABLE, &moved.0, json!({ "display_order": other.1 }));
        if let Err(e) = self.call(first).await {
            self.report("reorder", &e);
            self.remember(&e).await;
            return Err(e);
        }
        let second = self.gateway.update(R::TABLE, &other.0, json!({ "display_order": moved.1 }));
        if let Err(e) = self.call(second).await {
            warn!(
                "order of {} is inconsistent: {} moved to {} but {} kept it: {}",
                R::TABLE, moved.0, other.1, other.0, e
            );
            self.remember(&e).await;
            return Err(e);
        }

        self.load().await?;
        Ok(true)
    }

    /// One past the highest display order, or 1 for an empty list
    pub async fn next_display_order(&self) -> i32 {
        self.inner
            .read()
            .await
            .items
            .iter()
            .map(|r| r.display_order())
            .max()
            .map_or(1, |max| max + 1)
    }
}

impl<R: Activatable> ResourceBinding<R> {
    /// Flips `is_active` for a loaded row
    pub async fn toggle_active(&self, id: &RowId) -> Result<bool> {
        let Some(current) = self.get(id).await else {
            let mut v = ValidationError::new();
            v.invalid("id");
            return Err(v.into());
        };
        let active = !current.is_active();
        self.update(id, &json!({ "is_active": active, "updated_at": Utc::now() }))
            .await?;
        Ok(active)
    }
}

/// Running live-update task. Dropping it stops the task and releases the feed.
pub struct LiveUpdates {
    table: &'static str,
    task: Option<JoinHandle<()>>,
}

impl LiveUpdates {
    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stops the task and waits until the feed is released
    pub async fn close(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for LiveUpdates {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
