use crate::codec::OutboundMessage;
use crate::error::{LinkError, Result};
use crate::policy::DeliveryPolicy;
use crate::protocol::{MessageKind, UserId};
use ahash::AHashSet;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The host's connection to the sharing service.
///
/// Frames are delivered only for kinds with an installed listener.
pub trait Transport {
    fn create_message(&mut self, kind: MessageKind, sender: UserId) -> OutboundMessage {
        OutboundMessage::begin(kind, sender)
    }

    /// Hands `message` to the transport for delivery to every other peer.
    fn broadcast(&mut self, message: OutboundMessage, policy: DeliveryPolicy) -> Result<()>;

    /// Next delivered frame, if any.
    fn receive(&mut self) -> Result<Option<Bytes>>;

    fn add_listener(&mut self, kind: MessageKind);

    fn remove_listener(&mut self, kind: MessageKind);

    fn is_connected(&self) -> bool;
}

/// Source of the local user's identity.
pub trait Session {
    fn is_available(&self) -> bool;

    fn local_user_id(&self) -> UserId;
}

/// A frame handed to [`MemoryTransport::broadcast`].
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub kind: MessageKind,
    pub policy: DeliveryPolicy,
    pub data: Bytes,
}

type Inbox = Arc<Mutex<VecDeque<Bytes>>>;

fn lock(inbox: &Inbox) -> MutexGuard<'_, VecDeque<Bytes>> {
    inbox.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process transport. Once two endpoints are joined with
/// [`MemoryTransport::connect_to`], every broadcast from one lands in the
/// other's inbox. Broadcasts are also kept locally for inspection.
#[derive(Debug)]
pub struct MemoryTransport {
    sent: Vec<Broadcast>,
    inbox: Inbox,
    peers: Vec<Inbox>,
    listeners: AHashSet<MessageKind>,
    connected: bool,
    broadcast_count: u64,
    listener_changes: u64,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            peers: Vec::new(),
            listeners: AHashSet::new(),
            connected: true,
            broadcast_count: 0,
            listener_changes: 0,
        }
    }

    /// Two endpoints already connected to each other.
    pub fn create_pair() -> (Self, Self) {
        let mut a = Self::new();
        let mut b = Self::new();
        a.connect_to(&mut b);
        (a, b)
    }

    /// Joins both endpoints so each receives the other's broadcasts.
    pub fn connect_to(&mut self, other: &mut Self) {
        self.peers.push(Arc::clone(&other.inbox));
        other.peers.push(Arc::clone(&self.inbox));
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Queues a raw frame as if it arrived from the network.
    pub fn deliver(&mut self, data: impl Into<Bytes>) {
        lock(&self.inbox).push_back(data.into());
    }

    pub fn sent(&self) -> &[Broadcast] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<Broadcast> {
        std::mem::take(&mut self.sent)
    }

    pub fn broadcast_count(&self) -> u64 {
        self.broadcast_count
    }

    pub fn is_listening(&self, kind: MessageKind) -> bool {
        self.listeners.contains(&kind)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Total add/remove listener calls that changed the listener set.
    pub fn listener_changes(&self) -> u64 {
        self.listener_changes
    }

    pub fn pending(&self) -> usize {
        lock(&self.inbox).len()
    }

    fn accepts(&self, frame: &[u8]) -> bool {
        frame
            .first()
            .and_then(|b| MessageKind::from_u8(*b))
            .map(|kind| self.listeners.contains(&kind))
            .unwrap_or(false)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn broadcast(&mut self, message: OutboundMessage, policy: DeliveryPolicy) -> Result<()> {
        if !self.connected {
            return Err(LinkError::ConnectionClosed);
        }

        let kind = message.kind();
        let data = message.into_bytes();
        for peer in &self.peers {
            lock(peer).push_back(data.clone());
        }

        self.sent.push(Broadcast { kind, policy, data });
        self.broadcast_count += 1;
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Bytes>> {
        if !self.connected {
            return Err(LinkError::ConnectionClosed);
        }

        let mut inbox = lock(&self.inbox);
        while let Some(frame) = inbox.pop_front() {
            if self.accepts(&frame) {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    fn add_listener(&mut self, kind: MessageKind) {
        if self.listeners.insert(kind) {
            self.listener_changes += 1;
        }
    }

    fn remove_listener(&mut self, kind: MessageKind) {
        if self.listeners.remove(&kind) {
            self.listener_changes += 1;
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// A session with a fixed user id whose availability can be toggled.
#[derive(Debug, Clone)]
pub struct StaticSession {
    user_id: UserId,
    available: bool,
}

impl StaticSession {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            available: true,
        }
    }

    pub fn unavailable(user_id: UserId) -> Self {
        Self {
            user_id,
            available: false,
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}

impl Session for StaticSession {
    fn is_available(&self) -> bool {
        self.available
    }

    fn local_user_id(&self) -> UserId {
        self.user_id
    }
}
