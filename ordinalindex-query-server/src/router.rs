//! Notification Router fan-out side. Consumes the ordinal index core's
//! `Notification` channel and forwards each to the registry's
//! topic-matched connections. Pure fan-out: no buffering, no retries.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use ordinalindex_core::core::types::{Notification, NotificationKind};
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{
    ResponseEnvelope, TOPIC_ORDINAL_INSCRIPTIONS, TOPIC_ORDINAL_TRANSFERS, TOPIC_TOKEN_DEPLOYS,
    TOPIC_TOKEN_TRANSFERS, TYPE_ORDINAL_INSCRIPTION, TYPE_ORDINAL_TRANSFER, TYPE_TOKEN_DEPLOY,
    TYPE_TOKEN_TRANSFER,
};
use crate::registry::Registry;

fn route(notification: &Notification) -> (&'static str, i64) {
    match notification.kind {
        NotificationKind::NameRegistration | NotificationKind::NameUpdate => {
            (TOPIC_ORDINAL_INSCRIPTIONS, TYPE_ORDINAL_INSCRIPTION)
        }
        NotificationKind::NameTransfer => (TOPIC_ORDINAL_TRANSFERS, TYPE_ORDINAL_TRANSFER),
        NotificationKind::TokenDeploy => (TOPIC_TOKEN_DEPLOYS, TYPE_TOKEN_DEPLOY),
        NotificationKind::TokenMint => (TOPIC_TOKEN_TRANSFERS, TYPE_TOKEN_TRANSFER),
    }
}

fn to_message(notification: &Notification) -> Message {
    let (_, kind) = route(notification);
    let payload: serde_json::Value =
        serde_json::from_str(&notification.payload_json).unwrap_or(serde_json::Value::Null);
    let envelope = ResponseEnvelope::notification(
        kind,
        serde_json::json!({
            "event": notification.kind.as_str(),
            "block": notification.block,
            "txIndex": notification.tx_index,
            "payload": payload,
        }),
    );
    Message::Text(serde_json::to_string(&envelope).unwrap_or_default())
}

/// Spawns a background task draining `receiver` for as long as the
/// program runs, broadcasting each notification to its topic.
pub fn spawn_router(registry: Arc<Registry>, receiver: Receiver<Notification>) {
    std::thread::spawn(move || {
        for notification in receiver.iter() {
            let (topic, _) = route(&notification);
            let message = to_message(&notification);
            registry.broadcast(topic, message);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_registration_routes_to_ordinal_inscriptions_topic() {
        let notification = Notification {
            kind: NotificationKind::NameRegistration,
            payload_json: "{}".to_string(),
            block: 1,
            tx_index: 0,
        };
        let (topic, kind) = route(&notification);
        assert_eq!(topic, TOPIC_ORDINAL_INSCRIPTIONS);
        assert_eq!(kind, TYPE_ORDINAL_INSCRIPTION);
    }

    #[test]
    fn name_transfer_routes_to_ordinal_transfers_topic() {
        let notification = Notification {
            kind: NotificationKind::NameTransfer,
            payload_json: "{}".to_string(),
            block: 1,
            tx_index: 0,
        };
        let (topic, kind) = route(&notification);
        assert_eq!(topic, TOPIC_ORDINAL_TRANSFERS);
        assert_eq!(kind, TYPE_ORDINAL_TRANSFER);
    }
}
