//! Per-handler request/response contracts. Ordinal queries (31-36) are
//! answered directly from `OrdinalIndexCore`; everything else reads from
//! the node's wider ledger state, an external collaborator out of this
//! subsystem's scope, reached only through `ChainDataProvider`.

use ordinalindex_core::core::OrdinalIndexCore;
use serde_json::{json, Value};

use crate::protocol::*;
use crate::registry::{ConnId, Registry};

/// The ledger/mempool/smart-contract data this subsystem does not own.
/// The node supplies a real implementation; tests and standalone runs
/// can use `NullChainDataProvider`.
pub trait ChainDataProvider: Send + Sync {
    fn query(&self, type_code: i64, data: &Value) -> Result<Value, String>;
}

pub struct NullChainDataProvider;

impl ChainDataProvider for NullChainDataProvider {
    fn query(&self, _type_code: i64, _data: &Value) -> Result<Value, String> {
        Err("not available: this query is served by the node, not the ordinal index".to_string())
    }
}

fn require_str<'a>(data: &'a Value, field: &str) -> Result<&'a str, String> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing or invalid field: {field}"))
}

/// Dispatches one parsed request to its handler, producing the response
/// envelope that should be sent back on this connection.
pub fn handle_request(
    request: &RequestEnvelope,
    core: &OrdinalIndexCore,
    chain: &dyn ChainDataProvider,
    registry: &Registry,
    conn_id: ConnId,
) -> ResponseEnvelope {
    let result = match request.kind {
        TYPE_PING => return ResponseEnvelope::ok(TYPE_PONG, &request.id, json!({})),
        TYPE_SUBSCRIBE => return handle_subscribe(request, registry, conn_id),
        TYPE_UNSUBSCRIBE => return handle_unsubscribe(request, registry, conn_id),
        TYPE_ORDINAL_CNS_CHECK => handle_cns_check(request, core),
        TYPE_ORDINAL_CNS_LOOKUP => handle_cns_lookup(request, core),
        TYPE_ORDINAL_NAMES_BY_OWNER => handle_names_by_owner(request, core),
        TYPE_ORDINAL_GET_TOKEN => handle_get_token(request, core),
        TYPE_ORDINAL_LIST_TOKENS => handle_list_tokens(request, core),
        TYPE_ORDINAL_GET_TOKEN_BALANCE => handle_get_token_balance(request, core),
        TYPE_GET_STATUS
        | TYPE_GET_BALANCE
        | TYPE_GET_TRANSACTION
        | TYPE_GET_POOL
        | TYPE_GET_POOLS
        | TYPE_GET_POOLS_INFO
        | TYPE_GET_TRANSACTIONS
        | TYPE_GET_LAST_BLOCK_INFO
        | TYPE_GET_COUNTERS => chain.query(request.kind, &request.data),
        t if (TYPE_SMART_CONTRACT_FIRST..=TYPE_SMART_CONTRACT_LAST).contains(&t) => {
            chain.query(request.kind, &request.data)
        }
        t if (TYPE_TOKEN_QUERY_FIRST..=TYPE_TOKEN_QUERY_LAST).contains(&t) => {
            chain.query(request.kind, &request.data)
        }
        _ => Err(format!("unrecognized request type {}", request.kind)),
    };

    match result {
        Ok(data) => ResponseEnvelope::ok(request.kind, &request.id, data),
        Err(e) => ResponseEnvelope::error(&request.id, e),
    }
}

fn handle_subscribe(request: &RequestEnvelope, registry: &Registry, conn_id: ConnId) -> ResponseEnvelope {
    match require_str(&request.data, "topic") {
        Ok(topic) => {
            registry.subscribe(conn_id, topic);
            ResponseEnvelope::ok(TYPE_SUBSCRIBE, &request.id, json!({ "subscribed": topic }))
        }
        Err(e) => ResponseEnvelope::error(&request.id, e),
    }
}

fn handle_unsubscribe(
    request: &RequestEnvelope,
    registry: &Registry,
    conn_id: ConnId,
) -> ResponseEnvelope {
    match require_str(&request.data, "topic") {
        Ok(topic) => {
            registry.unsubscribe(conn_id, topic);
            ResponseEnvelope::ok(TYPE_UNSUBSCRIBE, &request.id, json!({ "unsubscribed": topic }))
        }
        Err(e) => ResponseEnvelope::error(&request.id, e),
    }
}

fn handle_cns_check(request: &RequestEnvelope, core: &OrdinalIndexCore) -> Result<Value, String> {
    let name = require_str(&request.data, "name")?;
    let namespace = request
        .data
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or("cns");
    let record = core.lookup_name(namespace, name)?;
    match record {
        None => Ok(json!({ "available": true })),
        Some(r) => Ok(json!({
            "available": false,
            "cnsInfo": {
                "protocol": r.namespace,
                "operation": "reg",
                "name": r.name,
                "holder": r.owner,
                "blockNumber": r.first_seen_block,
                "txIndex": r.first_seen_tx_index,
                "relay": r.relay,
            }
        })),
    }
}

fn handle_cns_lookup(request: &RequestEnvelope, core: &OrdinalIndexCore) -> Result<Value, String> {
    let name = require_str(&request.data, "name")?;
    let namespace = request
        .data
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or("cns");
    match core.lookup_name(namespace, name)? {
        None => Err(format!("name not found: {namespace}/{name}")),
        Some(r) => Ok(serde_json::to_value(r).map_err(|e| e.to_string())?),
    }
}

fn handle_names_by_owner(request: &RequestEnvelope, core: &OrdinalIndexCore) -> Result<Value, String> {
    let address = require_str(&request.data, "address")?;
    decode_address(address)?;
    let records = core.names_by_owner(address)?;
    Ok(json!({ "names": records }))
}

fn handle_get_token(request: &RequestEnvelope, core: &OrdinalIndexCore) -> Result<Value, String> {
    let ticker = require_str(&request.data, "ticker")?;
    match core.get_token(ticker)? {
        None => Err(format!("token not found: {ticker}")),
        Some(t) => Ok(serde_json::to_value(t).map_err(|e| e.to_string())?),
    }
}

fn handle_list_tokens(request: &RequestEnvelope, core: &OrdinalIndexCore) -> Result<Value, String> {
    let offset = request.data.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let limit = request.data.get("limit").and_then(Value::as_u64).unwrap_or(50) as usize;
    let filter = request.data.get("filter").and_then(Value::as_str);
    let tokens = core.list_tokens(offset, limit, filter)?;
    Ok(json!({ "tokens": tokens }))
}

fn handle_get_token_balance(
    request: &RequestEnvelope,
    core: &OrdinalIndexCore,
) -> Result<Value, String> {
    let address = require_str(&request.data, "address")?;
    let ticker = require_str(&request.data, "ticker")?;
    let raw = decode_address(address)?;
    let encoded_back = encode_address(&raw);
    let balance = core.get_token_balance(&encoded_back, ticker)?;
    let mut fields = amount_fields(balance);
    fields["address"] = json!(address);
    fields["ticker"] = json!(ticker);
    Ok(fields)
}
