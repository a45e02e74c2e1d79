//! Notification Router emission side. OIC emits through a
//! `crossbeam_channel::Sender`, matching the
//! crossbeam-channel-everywhere style the teacher uses for cross-thread
//! fan-out; the query server owns the receiver and does topic matching.

use crossbeam_channel::{Receiver, Sender};

use crate::core::types::{Notification, NotificationKind};

#[derive(Clone)]
pub struct NotificationRouter {
    sender: Sender<Notification>,
}

impl NotificationRouter {
    pub fn channel() -> (NotificationRouter, Receiver<Notification>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (NotificationRouter { sender }, receiver)
    }

    /// Emits a notification. Never fails the caller: a full/disconnected
    /// channel (no subscriber listening) is not an indexing error, it just
    /// means there is nothing to notify.
    pub fn emit(&self, kind: NotificationKind, payload_json: String, block: u64, tx_index: u32) {
        let _ = self.sender.send(Notification {
            kind,
            payload_json,
            block,
            tx_index,
        });
    }
}
