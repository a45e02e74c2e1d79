pub mod checkpoint;
pub mod keys;
pub mod kv;

pub use checkpoint::Checkpoint;
pub use kv::{KvError, OrdinalKv};
