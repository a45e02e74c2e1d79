//! Wire protocol types for the query/subscription server.

use base58::{FromBase58, ToBase58};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_data")]
    pub data: Value,
}

fn default_data() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "type")]
    pub kind: i64,
    pub id: String,
    pub data: Value,
}

impl ResponseEnvelope {
    pub fn ok(kind: i64, id: &str, data: Value) -> ResponseEnvelope {
        ResponseEnvelope {
            kind,
            id: id.to_string(),
            data,
        }
    }

    pub fn error(id: &str, message: impl Into<String>) -> ResponseEnvelope {
        ResponseEnvelope {
            kind: TYPE_ERROR,
            id: id.to_string(),
            data: serde_json::json!({ "error": message.into() }),
        }
    }

    pub fn notification(kind: i64, data: Value) -> ResponseEnvelope {
        ResponseEnvelope {
            kind,
            id: String::new(),
            data,
        }
    }
}

// Requests (1-99)
pub const TYPE_GET_STATUS: i64 = 1;
pub const TYPE_GET_BALANCE: i64 = 2;
pub const TYPE_GET_TRANSACTION: i64 = 3;
pub const TYPE_GET_POOL: i64 = 4;
pub const TYPE_GET_POOLS: i64 = 5;
pub const TYPE_GET_POOLS_INFO: i64 = 6;
pub const TYPE_GET_TRANSACTIONS: i64 = 7;
pub const TYPE_GET_LAST_BLOCK_INFO: i64 = 8;
pub const TYPE_GET_COUNTERS: i64 = 9;
pub const TYPE_SMART_CONTRACT_FIRST: i64 = 10;
pub const TYPE_SMART_CONTRACT_LAST: i64 = 12;
pub const TYPE_TOKEN_QUERY_FIRST: i64 = 13;
pub const TYPE_TOKEN_QUERY_LAST: i64 = 21;

// Ordinal queries (31-36), the part OIC actually answers directly.
pub const TYPE_ORDINAL_CNS_CHECK: i64 = 31;
pub const TYPE_ORDINAL_CNS_LOOKUP: i64 = 32;
pub const TYPE_ORDINAL_NAMES_BY_OWNER: i64 = 33;
pub const TYPE_ORDINAL_GET_TOKEN: i64 = 34;
pub const TYPE_ORDINAL_LIST_TOKENS: i64 = 35;
pub const TYPE_ORDINAL_GET_TOKEN_BALANCE: i64 = 36;

// Subscriptions
pub const TYPE_SUBSCRIBE: i64 = 100;
pub const TYPE_UNSUBSCRIBE: i64 = 101;

// Notifications (200-299)
pub const TYPE_NEW_BLOCK: i64 = 200;
pub const TYPE_NEW_TRANSACTION: i64 = 201;
pub const TYPE_TRANSACTION_STATUS: i64 = 202;
pub const TYPE_SMART_CONTRACT_EVENT: i64 = 203;
pub const TYPE_TOKEN_TRANSFER: i64 = 204;
pub const TYPE_TOKEN_DEPLOY: i64 = 205;
pub const TYPE_ORDINAL_INSCRIPTION: i64 = 206;
pub const TYPE_ORDINAL_TRANSFER: i64 = 207;

// Control
pub const TYPE_ERROR: i64 = 400;
pub const TYPE_PING: i64 = 500;
pub const TYPE_PONG: i64 = 501;

/// Recognized subscription topics.
pub const TOPIC_BLOCKS: &str = "blocks";
pub const TOPIC_TRANSACTIONS: &str = "transactions";
pub const TOPIC_SMART_CONTRACTS: &str = "smart_contracts";
pub const TOPIC_TOKEN_TRANSFERS: &str = "token_transfers";
pub const TOPIC_TOKEN_DEPLOYS: &str = "token_deploys";
pub const TOPIC_ORDINAL_INSCRIPTIONS: &str = "ordinal_inscriptions";
pub const TOPIC_ORDINAL_TRANSFERS: &str = "ordinal_transfers";

/// `tx:<txId>` is a topic family, not a single literal.
pub fn tx_topic(tx_id: &str) -> String {
    format!("tx:{tx_id}")
}

pub fn decode_address(address: &str) -> Result<Vec<u8>, String> {
    address
        .from_base58()
        .map_err(|_| "Invalid public key address format".to_string())
}

pub fn encode_address(raw: &[u8]) -> String {
    raw.to_base58()
}

/// Splits an `i64` amount into integral/fractional parts on a 1e18 basis
/// and a float convenience field.
pub fn amount_fields(amount: i64) -> Value {
    const FRACTION_BASE: i64 = 1_000_000_000_000_000_000;
    let integral = amount / FRACTION_BASE;
    let fraction = amount % FRACTION_BASE;
    let float_value = integral as f64 + (fraction as f64 / FRACTION_BASE as f64);
    serde_json::json!({
        "integral": integral,
        "fraction": fraction,
        "amount": float_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrips_through_base58() {
        let raw = vec![1, 2, 3, 4, 5];
        let encoded = encode_address(&raw);
        let decoded = decode_address(&encoded).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn invalid_base58_is_rejected() {
        assert!(decode_address("not-base58-!!!").is_err());
    }

    #[test]
    fn amount_fields_split_integral_and_fraction() {
        let fields = amount_fields(1_500_000_000_000_000_000);
        assert_eq!(fields["integral"], 1);
        assert_eq!(fields["fraction"], 500_000_000_000_000_000i64);
    }
}
