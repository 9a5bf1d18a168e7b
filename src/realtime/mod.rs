//! Row-change notifications over the realtime websocket

mod message;

pub use message::*;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

type Routes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<PostgresChange>>>>;
type Socket = Arc<Mutex<Option<mpsc::Sender<Message>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Realtime client. One websocket is shared by every table subscription.
#[derive(Clone)]
pub struct RealtimeClient {
    url: String,
    key: String,
    schema: String,
    heartbeat_interval: Duration,
    next_ref: Arc<AtomicU32>,
    // topic -> feed of that subscription
    routes: Routes,
    socket: Socket,
    state: Arc<Mutex<ConnectionState>>,
    connect_lock: Arc<AsyncMutex<()>>,
    access_token: Arc<Mutex<Option<String>>>,
}

impl RealtimeClient {
    pub fn new(url: &str, key: &str, schema: &str, heartbeat_interval: Duration) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            schema: schema.to_string(),
            heartbeat_interval,
            next_ref: Arc::new(AtomicU32::new(1)),
            routes: Arc::new(Mutex::new(HashMap::new())),
            socket: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            connect_lock: Arc::new(AsyncMutex::new(())),
            access_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Token sent with subsequent joins
    pub fn set_auth(&self, token: Option<String>) {
        debug!("realtime auth token set (is_some: {})", token.is_some());
        *lock(&self.access_token) = token;
    }

    pub fn connection_state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Number of live table subscriptions
    pub fn subscription_count(&self) -> usize {
        lock(&self.routes).len()
    }

    pub(crate) fn next_ref(&self) -> String {
        self.next_ref.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn set_state(state_arc: &Mutex<ConnectionState>, state: ConnectionState) {
        let mut current = lock(state_arc);
        if *current != state {
            trace!("realtime state {:?} -> {:?}", *current, state);
            *current = state;
        }
    }

    /// The websocket endpoint derived from the project URL
    pub fn websocket_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Error::realtime(format!("unsupported URL scheme: {}", other)));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::realtime(format!("cannot use scheme {} for {}", scheme, self.url)))?;
        url.set_path("/realtime/v1/websocket");
        url.query_pairs_mut()
            .clear()
            .append_pair("apikey", &self.key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    /// Opens the websocket unless it is already open
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.connect_lock.lock().await;
        if self.connection_state() == ConnectionState::Connected && lock(&self.socket).is_some() {
            return Ok(());
        }

        let ws_url = self.websocket_url()?;
        Self::set_state(&self.state, ConnectionState::Connecting);
        info!("connecting to realtime at {}", ws_url.host_str().unwrap_or("?"));

        let stream = match connect_async(ws_url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                error!("realtime connection failed: {}", e);
                Self::set_state(&self.state, ConnectionState::Disconnected);
                return Err(Error::realtime(format!("websocket connection failed: {}", e)));
            }
        };
        Self::set_state(&self.state, ConnectionState::Connected);

        let (mut write, mut read) = stream.split();
        let (socket_tx, mut socket_rx) = mpsc::channel::<Message>(100);
        *lock(&self.socket) = Some(socket_tx);

        tokio::spawn(async move {
            while let Some(message) = socket_rx.recv().await {
                trace!("realtime send: {:?}", message);
                if let Err(e) = write.send(message).await {
                    error!("realtime send failed: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
            debug!("realtime writer finished");
        });

        let socket = self.socket.clone();
        let routes = self.routes.clone();
        let state = self.state.clone();
        let next_ref = self.next_ref.clone();
        let period = self.heartbeat_interval;
        tokio::spawn(async move {
            let mut heartbeat = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => dispatch(&routes, &text),
                        Some(Ok(Message::Close(frame))) => {
                            debug!("realtime closed by server: {:?}", frame);
                            break;
                        }
                        Some(Ok(other)) => trace!("realtime ignoring frame: {:?}", other),
                        Some(Err(e)) => {
                            error!("realtime read failed: {}", e);
                            break;
                        }
                        None => break,
                    },
                    _ = heartbeat.tick() => {
                        let tx = lock(&socket).clone();
                        let Some(tx) = tx else {
                            debug!("realtime socket released, stopping reader");
                            break;
                        };
                        let beat = RealtimeMessage::heartbeat(
                            next_ref.fetch_add(1, Ordering::SeqCst).to_string(),
                        );
                        let Ok(text) = serde_json::to_string(&beat) else { continue };
                        if tx.send(Message::Text(text)).await.is_err() {
                            warn!("realtime heartbeat failed, assuming connection lost");
                            break;
                        }
                    }
                }
            }
            *lock(&socket) = None;
            // dropping the senders ends every open feed
            lock(&routes).clear();
            RealtimeClient::set_state(&state, ConnectionState::Disconnected);
            debug!("realtime reader finished");
        });

        Ok(())
    }

    async fn send(&self, message: RealtimeMessage) -> Result<()> {
        let text = serde_json::to_string(&message)?;
        let tx = lock(&self.socket).clone();
        match tx {
            Some(tx) => tx
                .send(Message::Text(text))
                .await
                .map_err(|e| Error::realtime(format!("failed to queue message: {}", e))),
            None => Err(Error::realtime("realtime socket unavailable")),
        }
    }

    /// Joins a fresh channel for every change to `table`
    pub async fn subscribe_table(&self, table: &str) -> Result<TableSubscription> {
        self.connect().await?;

        let topic = format!("realtime:{}-{}", table, Uuid::new_v4());
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.routes).insert(topic.clone(), tx);

        let token = lock(&self.access_token).clone();
        let join = RealtimeMessage::join(&topic, &self.schema, table, token.as_deref(), self.next_ref());
        if let Err(e) = self.send(join).await {
            lock(&self.routes).remove(&topic);
            return Err(e);
        }
        info!("listening for changes on {}", table);

        Ok(TableSubscription {
            receiver: rx,
            guard: LeaveGuard {
                topic,
                client: self.clone(),
                left: false,
            },
        })
    }

    fn leave(&self, topic: &str) {
        if lock(&self.routes).remove(topic).is_none() {
            return;
        }
        let tx = lock(&self.socket).clone();
        if let Some(tx) = tx {
            let leave = RealtimeMessage::leave(topic, self.next_ref());
            match serde_json::to_string(&leave) {
                Ok(text) => {
                    if let Err(e) = tx.try_send(Message::Text(text)) {
                        warn!("could not send leave for {}: {}", topic, e);
                    }
                }
                Err(e) => warn!("could not encode leave for {}: {}", topic, e),
            }
        }
        debug!("left {}", topic);
    }

    /// Closes the websocket and ends every open subscription
    pub fn disconnect(&self) {
        if lock(&self.socket).take().is_some() {
            info!("realtime disconnected");
        }
        lock(&self.routes).clear();
        Self::set_state(&self.state, ConnectionState::Disconnected);
    }
}

fn dispatch(routes: &Routes, text: &str) {
    let message = match serde_json::from_str::<RealtimeMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            error!("unparseable realtime frame: {}. Raw: {}", e, text);
            return;
        }
    };
    if let Some(reason) = message.reply_error() {
        warn!("realtime request on {} failed: {}", message.topic, reason);
        return;
    }
    let Some(change) = message.as_change() else {
        trace!("realtime {} on {}", message.event, message.topic);
        return;
    };

    let mut routes = lock(routes);
    if let Some(tx) = routes.get(&message.topic) {
        if tx.send(change).is_err() {
            routes.remove(&message.topic);
        }
    } else {
        debug!("change for unknown topic {}", message.topic);
    }
}

/// Leaves its channel when dropped
pub struct LeaveGuard {
    topic: String,
    client: RealtimeClient,
    left: bool,
}

impl LeaveGuard {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn leave(&mut self) {
        if !self.left {
            self.left = true;
            self.client.leave(&self.topic);
        }
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        self.leave();
    }
}

/// Change notices for one table
pub struct TableSubscription {
    receiver: mpsc::UnboundedReceiver<PostgresChange>,
    guard: LeaveGuard,
}

impl TableSubscription {
    pub async fn recv(&mut self) -> Option<PostgresChange> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.guard.leave();
    }

    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<PostgresChange>, LeaveGuard) {
        (self.receiver, self.guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn client(url: &str) -> RealtimeClient {
        RealtimeClient::new(url, "anon", "public", Duration::from_secs(30))
    }

    #[test]
    fn websocket_url_maps_scheme() {
        let url = client("https://abc.supabase.co").websocket_url().unwrap();
        assert_eq!(
            url.as_str(),
            "wss://abc.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
        let url = client("http://localhost:54321/").websocket_url().unwrap();
        assert!(url.as_str().starts_with("ws://localhost:54321/realtime/v1/websocket?"));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert!(client("ftp://example.com").websocket_url().is_err());
    }

    #[tokio::test]
    async fn subscribe_fails_when_unreachable() {
        let realtime = client("http://127.0.0.1:9");
        let err = realtime.subscribe_table("services").await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Gateway);
        assert_eq!(realtime.connection_state(), ConnectionState::Disconnected);
        assert_eq!(realtime.subscription_count(), 0);
    }

    #[test]
    fn dispatch_routes_by_topic() {
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        lock(&routes).insert("realtime:faqs-1".to_string(), tx);

        dispatch(
            &routes,
            r#"{"topic":"realtime:faqs-1","event":"postgres_changes","payload":{"data":{"table":"faqs","type":"UPDATE"}},"ref":null}"#,
        );
        dispatch(&routes, "not json");

        assert_eq!(
            rx.try_recv().unwrap(),
            PostgresChange {
                table: "faqs".into(),
                kind: ChangeKind::Update
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
