//! Public write paths: appointment booking and the contact form

mod booking;
mod contact;

use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::gateway::Gateway;

pub use booking::*;
pub use contact::*;

/// Visible state of a public form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Editing,
    Submitting,
    /// Success message is showing
    Submitted,
    /// Success message has been dismissed
    Dismissed,
    Failed(String),
}

/// Status channel plus the pending timer that moves it on after a success
struct StatusCell {
    tx: Arc<watch::Sender<FormStatus>>,
    timer: Option<JoinHandle<()>>,
}

impl StatusCell {
    fn new() -> Self {
        let (tx, _) = watch::channel(FormStatus::Editing);
        Self {
            tx: Arc::new(tx),
            timer: None,
        }
    }

    fn get(&self) -> FormStatus {
        self.tx.borrow().clone()
    }

    fn set(&mut self, status: FormStatus) {
        self.cancel_timer();
        self.tx.send_replace(status);
    }

    fn watch(&self) -> watch::Receiver<FormStatus> {
        self.tx.subscribe()
    }

    /// Moves to `Submitting` until the returned guard drops
    fn submitting(&mut self) -> SubmitGuard {
        self.set(FormStatus::Submitting);
        SubmitGuard {
            tx: self.tx.clone(),
        }
    }

    /// After `delay`, replace `Submitted` with `next` unless the status moved on already
    fn after(&mut self, delay: Duration, next: FormStatus) {
        self.cancel_timer();
        let tx = self.tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_if_modified(|status| {
                if *status == FormStatus::Submitted {
                    *status = next;
                    true
                } else {
                    false
                }
            });
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for StatusCell {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Puts a form back to `Editing` if its submit future is dropped mid-insert
struct SubmitGuard {
    tx: Arc<watch::Sender<FormStatus>>,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.tx.send_if_modified(|status| {
            if *status == FormStatus::Submitting {
                *status = FormStatus::Editing;
                true
            } else {
                false
            }
        });
    }
}

/// Inserts one row for a form, bounded by `timeout`
async fn insert_row<T: Serialize>(
    gateway: &dyn Gateway,
    table: &str,
    row: &T,
    timeout: Duration,
) -> Result<()> {
    let row = serde_json::to_value(row)?;
    match tokio::time::timeout(timeout, gateway.insert(table, vec![row])).await {
        Ok(Ok(_)) => {
            info!("new row in {}", table);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("insert into {} failed: {}", table, e);
            Err(e)
        }
        Err(_) => {
            error!("insert into {} timed out after {:?}", table, timeout);
            Err(Error::Timeout(timeout))
        }
    }
}
