//! Key layout for the ordinal index KV store.

pub const NAME_PREFIX: u8 = 0x01;
pub const TOKEN_PREFIX: u8 = 0x02;
pub const BALANCE_PREFIX: u8 = 0x03;
pub const META_PREFIX: u8 = 0x04;

/// `0x01 || namespace_lower || ':' || name_lower`
pub fn name_key(namespace: &str, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + namespace.len() + 1 + name.len());
    key.push(NAME_PREFIX);
    key.extend_from_slice(namespace.as_bytes());
    key.push(b':');
    key.extend_from_slice(name.as_bytes());
    key
}

/// `0x02 || ticker`
pub fn token_key(ticker: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ticker.len());
    key.push(TOKEN_PREFIX);
    key.extend_from_slice(ticker.as_bytes());
    key
}

/// `0x03 || publicKey(raw) || ticker`
pub fn balance_key(public_key: &[u8], ticker: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + public_key.len() + ticker.len());
    key.push(BALANCE_PREFIX);
    key.extend_from_slice(public_key);
    key.extend_from_slice(ticker.as_bytes());
    key
}

/// `0x04 || poolSeq(u64, big-endian) || txIndex(u64, big-endian)`.
///
/// Big-endian so ascending byte order matches ascending (block, tx_index)
/// order, which lets `iterate_prefix` on `META_PREFIX` walk the audit log
/// in canonical chain order.
pub fn meta_key(pool_seq: u64, tx_index: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8 + 8);
    key.push(META_PREFIX);
    key.extend_from_slice(&pool_seq.to_be_bytes());
    key.extend_from_slice(&(tx_index as u64).to_be_bytes());
    key
}

/// Next key strictly greater than every key starting with `prefix`, used as
/// an iterator upper bound. Returns `None` if `prefix` is all `0xff` bytes
/// (no such bound exists; iteration should run unbounded in that case).
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    for i in (0..bound.len()).rev() {
        if bound[i] != 0xff {
            bound[i] += 1;
            bound.truncate(i + 1);
            return Some(bound);
        }
    }
    None
}
