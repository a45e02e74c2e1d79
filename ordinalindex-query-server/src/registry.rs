//! Per-connection subscription registry. A single mutex guards the
//! `{connection -> topics}` map.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::Sender;
use tokio_tungstenite::tungstenite::Message;

pub type ConnId = u64;

/// Bounded so one slow reader cannot unbound the process's memory; a send
/// failure past this bound closes the connection without affecting any
/// other connection.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

struct Connection {
    topics: HashSet<String>,
    sender: Sender<Message>,
}

pub struct Registry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnId, Connection>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            next_id: AtomicU64::new(1),
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, sender: Sender<Message>) -> ConnId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.connections.lock().unwrap().insert(
            id,
            Connection {
                topics: HashSet::new(),
                sender,
            },
        );
        id
    }

    pub fn unregister(&self, id: ConnId) {
        self.connections.lock().unwrap().remove(&id);
    }

    pub fn subscribe(&self, id: ConnId, topic: &str) {
        if let Some(conn) = self.connections.lock().unwrap().get_mut(&id) {
            conn.topics.insert(topic.to_string());
        }
    }

    pub fn unsubscribe(&self, id: ConnId, topic: &str) {
        if let Some(conn) = self.connections.lock().unwrap().get_mut(&id) {
            conn.topics.remove(topic);
        }
    }

    /// Sends `message` directly to one connection's outbound queue,
    /// bypassing topic matching (used for request/response replies rather
    /// than subscription broadcasts).
    pub fn send_direct(&self, id: ConnId, message: Message) {
        if let Some(conn) = self.connections.lock().unwrap().get(&id) {
            let _ = conn.sender.try_send(message);
        }
    }

    /// Sends `message` to every connection currently subscribed to
    /// `topic`. Per-notification, best-effort: a full outbound queue just
    /// drops that connection's copy of this one message. The router
    /// itself does no buffering or retrying; the bounded queue here is
    /// this crate's own backpressure policy, not a protocol guarantee.
    pub fn broadcast(&self, topic: &str, message: Message) {
        let senders: Vec<Sender<Message>> = {
            let connections = self.connections.lock().unwrap();
            connections
                .values()
                .filter(|c| c.topics.contains(topic))
                .map(|c| c.sender.clone())
                .collect()
        };
        for sender in senders {
            let _ = sender.try_send(message.clone());
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
