//! Transport-agnostic handle to a live client connection.
//!
//! The WebSocket layer owns the socket itself. Everything else talks to the
//! connection through this handle: outbound frames are queued on an unbounded
//! channel that the socket's writer task drains. Termination is signalled out
//! of band so it does not wait behind queued frames.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{RwLock, mpsc, watch};
use uuid::Uuid;

use super::{
    error::ConnectionClosed,
    value_object::{Role, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frame queued for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Liveness probe.
    Ping,
    /// Close the transport and stop writing.
    Close,
}

pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundFrame>;

/// What the connection has claimed about itself so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionMeta {
    pub role: Option<Role>,
    pub user_id: Option<UserId>,
    /// Subject of the last verified token.
    pub subject: Option<String>,
}

pub struct Connection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<OutboundFrame>,
    alive: AtomicBool,
    terminated: AtomicBool,
    kill: watch::Sender<bool>,
    connected_at: i64,
    meta: RwLock<ConnectionMeta>,
}

impl Connection {
    /// Create a connection handle and the receiving end its writer drains.
    pub fn new(connected_at: i64) -> (Arc<Self>, OutboundReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            id: ConnectionId::generate(),
            sender,
            alive: AtomicBool::new(true),
            terminated: AtomicBool::new(false),
            kill: watch::Sender::new(false),
            connected_at,
            meta: RwLock::new(ConnectionMeta::default()),
        });
        (connection, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> i64 {
        self.connected_at
    }

    /// `true` until the connection is terminated or its writer goes away.
    pub fn is_open(&self) -> bool {
        !self.terminated.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Called when the remote end acknowledges a probe.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Clear the liveness flag and send a probe.
    pub fn probe(&self) -> Result<(), ConnectionClosed> {
        self.alive.store(false, Ordering::Release);
        self.push(OutboundFrame::Ping)
    }

    pub fn send_text(&self, text: String) -> Result<(), ConnectionClosed> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(ConnectionClosed);
        }
        self.push(OutboundFrame::Text(text))
    }

    /// Forcibly close the transport. Calling it twice is harmless.
    ///
    /// A close frame is queued for writers that keep up, and [`Self::terminated`]
    /// resolves at once so the socket owner can drop a writer that is stuck.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.kill.send_replace(true);
        if self.push(OutboundFrame::Close).is_err() {
            tracing::debug!(connection_id = %self.id, "Writer already gone while terminating");
        }
    }

    /// Resolves once [`Self::terminate`] has been called.
    pub async fn terminated(&self) {
        let mut kill = self.kill.subscribe();
        // The sender lives as long as `self`, so this only returns once flagged.
        let _ = kill.wait_for(|terminated| *terminated).await;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub async fn meta(&self) -> ConnectionMeta {
        self.meta.read().await.clone()
    }

    /// Remember the role, user and token subject the connection last presented.
    pub async fn record_claim(
        &self,
        role: Option<Role>,
        user_id: Option<UserId>,
        subject: Option<String>,
    ) {
        let mut meta = self.meta.write().await;
        if role.is_some() {
            meta.role = role;
        }
        if user_id.is_some() {
            meta.user_id = user_id;
        }
        if subject.is_some() {
            meta.subject = subject;
        }
    }

    fn push(&self, frame: OutboundFrame) -> Result<(), ConnectionClosed> {
        self.sender.send(frame).map_err(|_| ConnectionClosed)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .field("open", &self.is_open())
            .finish()
    }
}
