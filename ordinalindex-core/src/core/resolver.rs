//! Address → canonical public-key resolution. The trait lives in
//! `ordinalindex-core` rather than in `ordinalindex-bridge` because the
//! engine needs it directly to build `0x03` balance keys from a
//! transaction's `source`/`target` address; the bridge crate supplies the
//! concrete implementation and wires it in at construction time.

/// Wallet/address cryptography is out of scope for this subsystem; the
/// resolver is an external collaborator the node provides.
pub trait PubkeyResolver: Send + Sync {
    fn resolve(&self, address: &str) -> Result<Vec<u8>, String>;
}

/// Identity resolver used in tests: treats the address string's own UTF-8
/// bytes as its "public key", which is sufficient to exercise balance-key
/// construction without pulling in real address cryptography.
#[cfg(test)]
pub struct IdentityResolver;

#[cfg(test)]
impl PubkeyResolver for IdentityResolver {
    fn resolve(&self, address: &str) -> Result<Vec<u8>, String> {
        Ok(address.as_bytes().to_vec())
    }
}
