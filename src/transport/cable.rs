//! Action Cable consumer.
//!
//! One WebSocket per transport, driven by a plain thread: tungstenite is
//! blocking, so the thread polls the socket with a short read timeout and
//! drains a crossbeam control channel between reads.
//!
//! ```text
//! Coordinator --subscribe--> CableTransport --Control--> cable thread <--frames-- server
//!      ^                                                      |
//!      +---------------- Notification (tokio mpsc) -----------+
//! ```
//!
//! Several coordinators may share an identifier; the server sees a single
//! subscription per identifier and the thread fans messages out locally.

use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::HeaderValue;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;

use super::{Notification, Subscription, Transport, TransportError};

/// Subprotocol Action Cable servers speak.
const CABLE_PROTOCOL: &str = "actioncable-v1-json";

/// How long a socket read may block before control messages are drained.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Messages from transport handles to the cable thread.
enum Control {
    Subscribe {
        key: String,
        id: u64,
        tx: mpsc::UnboundedSender<Notification>,
    },
    Unsubscribe {
        key: String,
        id: u64,
    },
    Shutdown,
}

/// Outbound protocol frame.
#[derive(Serialize)]
struct Command<'a> {
    command: &'a str,
    identifier: &'a str,
}

/// Inbound protocol frame. Broadcasts carry `identifier` and `message`,
/// control frames carry `type`.
#[derive(Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: Option<String>,
    identifier: Option<String>,
    message: Option<serde_json::Value>,
    reason: Option<String>,
}

/// Subscription identifier as the server sees it.
fn subscription_key(channel: &str, identifier: &str) -> String {
    serde_json::json!({ "channel": channel, "identifier": identifier }).to_string()
}

/// Decode a broadcast payload; a payload without `identifier` inherits the
/// subscribed one.
fn decode_message(key: &str, message: serde_json::Value) -> Option<Notification> {
    let mut notification: Notification = match serde_json::from_value(message) {
        Ok(n) => n,
        Err(e) => {
            crate::log!("cable"; "ignoring malformed message on {}: {}", key, e);
            return None;
        }
    };
    if notification.identifier.is_empty() {
        notification.identifier = serde_json::from_str::<serde_json::Value>(key)
            .ok()
            .and_then(|v| v.get("identifier")?.as_str().map(str::to_string))
            .unwrap_or_default();
    }
    Some(notification)
}

/// Transport backed by an Action Cable server.
pub struct CableTransport {
    url: String,
    control: Sender<Control>,
    next_id: AtomicU64,
}

impl CableTransport {
    /// Open the WebSocket and start the cable thread.
    pub fn connect(url: &str, origin: Option<&str>) -> Result<Self, TransportError> {
        let connect_error = |message: String| TransportError::Connect {
            url: url.to_string(),
            message,
        };

        let mut request = url
            .into_client_request()
            .map_err(|e| connect_error(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert("Sec-WebSocket-Protocol", HeaderValue::from_static(CABLE_PROTOCOL));
        if let Some(origin) = origin {
            let origin = HeaderValue::from_str(origin).map_err(|e| connect_error(e.to_string()))?;
            headers.insert("Origin", origin);
        }

        let (mut socket, _response) =
            tungstenite::connect(request).map_err(|e| connect_error(e.to_string()))?;
        // The worker polls with a read timeout; only plain TCP supports it.
        match socket.get_mut() {
            MaybeTlsStream::Plain(stream) => stream
                .set_read_timeout(Some(POLL_INTERVAL))
                .map_err(|e| connect_error(e.to_string()))?,
            _ => return Err(connect_error("only ws:// endpoints are supported".into())),
        }
        crate::log!("cable"; "connected to {}", url);

        let (control, control_rx) = channel::unbounded();
        std::thread::spawn(move || CableWorker::new(socket, control_rx).run());

        Ok(Self {
            url: url.to_string(),
            control,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for CableTransport {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
    }
}

#[async_trait]
impl Transport for CableTransport {
    async fn subscribe(&self, channel: &str, identifier: &str) -> Result<Subscription, TransportError> {
        let key = subscription_key(channel, identifier);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.control
            .send(Control::Subscribe {
                key: key.clone(),
                id,
                tx,
            })
            .map_err(|_| TransportError::Closed)?;

        let control = self.control.clone();
        Ok(Subscription::new(rx, move || {
            let _ = control.send(Control::Unsubscribe { key, id });
        }))
    }
}

/// Owns the socket. Runs until shutdown, socket close or every handle drops.
struct CableWorker {
    socket: Socket,
    control: Receiver<Control>,
    streams: FxHashMap<String, Vec<(u64, mpsc::UnboundedSender<Notification>)>>,
}

impl CableWorker {
    fn new(socket: Socket, control: Receiver<Control>) -> Self {
        Self {
            socket,
            control,
            streams: FxHashMap::default(),
        }
    }

    fn run(mut self) {
        loop {
            loop {
                match self.control.try_recv() {
                    Ok(Control::Shutdown) | Err(TryRecvError::Disconnected) => {
                        crate::debug!("cable"; "shutting down");
                        let _ = self.socket.close(None);
                        let _ = self.socket.flush();
                        return;
                    }
                    Ok(control) => self.handle(control),
                    Err(TryRecvError::Empty) => break,
                }
            }

            match self.socket.read() {
                Ok(Message::Text(text)) => self.dispatch(text.as_str()),
                Ok(Message::Close(_)) => {
                    crate::log!("cable"; "server closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    // Pending pongs and queued commands go out here.
                    let _ = self.socket.flush();
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    crate::log!("cable"; "connection closed");
                    break;
                }
                Err(e) => {
                    crate::log!("cable"; "read failed: {}", e);
                    break;
                }
            }
        }
        // Dropping the senders ends every subscription.
        self.streams.clear();
    }

    fn handle(&mut self, control: Control) {
        match control {
            Control::Subscribe { key, id, tx } => {
                let subscribers = self.streams.entry(key.clone()).or_default();
                subscribers.push((id, tx));
                if subscribers.len() == 1 {
                    self.send("subscribe", &key);
                }
            }
            Control::Unsubscribe { key, id } => {
                let Some(subscribers) = self.streams.get_mut(&key) else {
                    return;
                };
                subscribers.retain(|(sid, _)| *sid != id);
                if subscribers.is_empty() {
                    self.streams.remove(&key);
                    self.send("unsubscribe", &key);
                }
            }
            Control::Shutdown => {}
        }
    }

    fn send(&mut self, command: &str, key: &str) {
        let frame = Command {
            command,
            identifier: key,
        };
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                crate::log!("cable"; "cannot encode {} command: {}", command, e);
                return;
            }
        };
        crate::debug!("cable"; "{} {}", command, key);
        if let Err(e) = self.socket.send(Message::Text(text.into())) {
            crate::log!("cable"; "failed to send {}: {}", command, e);
        }
    }

    fn dispatch(&mut self, text: &str) {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                crate::debug!("cable"; "unreadable frame: {}", e);
                return;
            }
        };

        match frame.kind.as_deref() {
            Some("ping") => return,
            Some("welcome") => {
                crate::debug!("cable"; "welcome");
                return;
            }
            Some("confirm_subscription") => {
                crate::debug!("cable"; "confirmed {}", frame.identifier.unwrap_or_default());
                return;
            }
            Some("reject_subscription") => {
                crate::log!("cable"; "subscription rejected: {}", frame.identifier.unwrap_or_default());
                return;
            }
            Some("disconnect") => {
                crate::log!("cable"; "disconnect requested: {}", frame.reason.unwrap_or_default());
                return;
            }
            _ => {}
        }

        let (Some(key), Some(message)) = (frame.identifier, frame.message) else {
            return;
        };
        let Some(notification) = decode_message(&key, message) else {
            return;
        };
        if let Some(subscribers) = self.streams.get_mut(&key) {
            subscribers.retain(|(_, tx)| tx.send(notification.clone()).is_ok());
        }
    }
}
