//! Reload notifier: a WebSocket server browser extensions connect to.
//!
//! The notifier owns its connection set. Broadcasting is a method call, not
//! a channel captured at startup: whoever holds the notifier decides when a
//! reload goes out. Delivery is best-effort and at-most-once; clients that
//! connect after a broadcast never see it.

use super::protocol::ReloadEvent;
use crate::error::{Error, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// Lifecycle of one extension connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered, handshake not finished.
    Connecting,
    /// Ready to receive broadcasts.
    Open,
    /// Going away; never sent to again.
    Closing,
}

#[derive(Debug)]
struct ClientHandle {
    state: ConnectionState,
    tx: mpsc::UnboundedSender<String>,
}

/// The set of live connections.
#[derive(Debug, Default)]
pub(crate) struct ClientSet {
    next_id: AtomicU64,
    clients: Mutex<BTreeMap<u64, ClientHandle>>,
}

impl ClientSet {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, ClientHandle>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(
            id,
            ClientHandle {
                state: ConnectionState::Connecting,
                tx,
            },
        );
        (id, rx)
    }

    pub(crate) fn set_state(&self, id: u64, state: ConnectionState) {
        if let Some(client) = self.lock().get_mut(&id) {
            client.state = state;
        }
    }

    pub(crate) fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    pub(crate) fn open_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|c| c.state == ConnectionState::Open)
            .count()
    }

    fn clear(&self) {
        self.lock().clear();
    }

    /// Send `payload` to every open connection, returning how many got it.
    pub(crate) fn broadcast(&self, payload: &str) -> usize {
        let clients = self.lock();
        let mut sent = 0;
        for (id, client) in clients.iter() {
            if client.state != ConnectionState::Open {
                trace!(id, state = ?client.state, "skipping connection that is not open");
                continue;
            }
            // A failed send means the connection task is already gone.
            if client.tx.send(payload.to_string()).is_ok() {
                sent += 1;
            } else {
                debug!(id, "connection closed before broadcast");
            }
        }
        sent
    }
}

/// Long-lived socket server for connected extensions.
///
/// Dropping the notifier stops the server and disconnects every client.
#[derive(Debug)]
pub struct ReloadNotifier {
    clients: Arc<ClientSet>,
    local_addr: SocketAddr,
    server: JoinHandle<()>,
}

impl ReloadNotifier {
    /// Bind `host:port` and start accepting connections.
    ///
    /// Port `0` picks an ephemeral port; see [`local_addr`](Self::local_addr).
    pub async fn start(host: &str, port: u16) -> Result<Self> {
        let bind_host = if host == "localhost" { "127.0.0.1" } else { host };
        let addr = format!("{bind_host}:{port}");

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::socket_bind(&addr, e))?;
        let local_addr = listener.local_addr()?;

        let clients = Arc::new(ClientSet::default());
        let app = Router::new()
            .route("/", get(upgrade))
            .route("/*path", get(upgrade))
            .with_state(Arc::clone(&clients));

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "reload server stopped");
            }
        });

        info!(addr = %local_addr, "reload server listening");
        Ok(Self {
            clients,
            local_addr,
            server,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections currently able to receive broadcasts.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.open_count()
    }

    /// Send `event` to every open connection. Returns the number reached.
    pub fn broadcast(&self, event: &ReloadEvent) -> usize {
        let sent = self.clients.broadcast(&event.to_json());
        info!(
            clients = sent,
            files = event.changed_files.len(),
            "reload broadcast"
        );
        sent
    }

    /// Stop accepting connections and drop every client.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for ReloadNotifier {
    fn drop(&mut self) {
        self.server.abort();
        self.clients.clear();
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(clients): State<Arc<ClientSet>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, clients))
}

async fn handle_socket(socket: WebSocket, clients: Arc<ClientSet>) {
    let (id, mut outbound) = clients.register();
    let (mut sink, mut inbound) = socket.split();
    clients.set_state(id, ConnectionState::Open);
    debug!(id, "extension connected");

    loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Some(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    clients.set_state(id, ConnectionState::Closing);
    clients.remove(id);
    debug!(id, "extension disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite};

    #[test]
    fn test_broadcast_skips_connections_not_open() {
        let clients = ClientSet::default();
        let (_connecting, mut connecting_rx) = clients.register();
        let (open, mut open_rx) = clients.register();
        let (closing, mut closing_rx) = clients.register();
        clients.set_state(open, ConnectionState::Open);
        clients.set_state(closing, ConnectionState::Closing);

        assert_eq!(clients.broadcast("{}"), 1);
        assert_eq!(open_rx.try_recv().unwrap(), "{}");
        assert!(connecting_rx.try_recv().is_err());
        assert!(closing_rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_tolerates_dropped_receiver() {
        let clients = ClientSet::default();
        let (id, rx) = clients.register();
        clients.set_state(id, ConnectionState::Open);
        drop(rx);

        assert_eq!(clients.broadcast("{}"), 0);
    }

    async fn wait_for_clients(notifier: &ReloadNotifier, n: usize) {
        for _ in 0..200 {
            if notifier.client_count() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} connected client(s), got {}", notifier.client_count());
    }

    #[tokio::test]
    async fn test_connected_client_receives_exactly_one_message() {
        let notifier = ReloadNotifier::start("127.0.0.1", 0).await.unwrap();
        let url = format!("ws://{}", notifier.local_addr());
        let (mut socket, _) = connect_async(url).await.unwrap();
        wait_for_clients(&notifier, 1).await;

        let sent = notifier.broadcast(&ReloadEvent::reload(vec!["popup.js".to_string()]));
        assert_eq!(sent, 1);

        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(
            msg.into_text().unwrap().to_string(),
            r#"{"action":"reload","changedFiles":["popup.js"]}"#
        );

        let extra = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
        assert!(extra.is_err(), "no second message expected");
    }

    #[tokio::test]
    async fn test_no_replay_for_late_clients() {
        let notifier = ReloadNotifier::start("127.0.0.1", 0).await.unwrap();
        assert_eq!(
            notifier.broadcast(&ReloadEvent::reload(vec!["a.js".to_string()])),
            0
        );

        let (mut socket, _) = connect_async(format!("ws://{}/", notifier.local_addr()))
            .await
            .unwrap();
        wait_for_clients(&notifier, 1).await;

        let early = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
        assert!(early.is_err(), "late client must not receive earlier events");
    }

    #[tokio::test]
    async fn test_disconnect_removes_client() {
        let notifier = ReloadNotifier::start("127.0.0.1", 0).await.unwrap();
        let (mut socket, _) = connect_async(format!("ws://{}", notifier.local_addr()))
            .await
            .unwrap();
        wait_for_clients(&notifier, 1).await;

        socket
            .close(Some(tungstenite::protocol::CloseFrame {
                code: tungstenite::protocol::frame::coding::CloseCode::Normal,
                reason: "bye".into(),
            }))
            .await
            .unwrap();
        wait_for_clients(&notifier, 0).await;
    }

    #[tokio::test]
    async fn test_port_in_use_is_bind_error() {
        let first = ReloadNotifier::start("127.0.0.1", 0).await.unwrap();
        let port = first.local_addr().port();

        let err = ReloadNotifier::start("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, Error::SocketBind { .. }));
        assert!(err.to_string().contains(&port.to_string()));
    }
}
