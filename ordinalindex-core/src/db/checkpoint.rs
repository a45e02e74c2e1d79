use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use memmap2::MmapMut;

/// A block sequence that has never been indexed / is not a valid
/// checkpoint. Forces recreate mode when read back from disk.
pub const WRONG_SENTINEL: u64 = u64::MAX;

/// Fixed-size (8 byte) memory-mapped checkpoint file holding the last
/// fully-indexed block sequence.
pub struct Checkpoint {
    mmap: MmapMut,
}

impl Checkpoint {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let is_new = !path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.set_len(8)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        let mut checkpoint = Checkpoint { mmap };
        if is_new {
            checkpoint.store(WRONG_SENTINEL);
        }
        Ok(checkpoint)
    }

    pub fn load(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.mmap[0..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn store(&mut self, seq: u64) {
        self.mmap[0..8].copy_from_slice(&seq.to_le_bytes());
        let _ = self.mmap.flush();
    }

    pub fn is_wrong(&self) -> bool {
        self.load() == WRONG_SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_starts_at_wrong_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordinal_last_indexed");
        let cp = Checkpoint::open(&path).unwrap();
        assert!(cp.is_wrong());
    }

    #[test]
    fn store_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordinal_last_indexed");
        let mut cp = Checkpoint::open(&path).unwrap();
        cp.store(42);
        assert_eq!(cp.load(), 42);
        drop(cp);
        let cp2 = Checkpoint::open(&path).unwrap();
        assert_eq!(cp2.load(), 42);
    }
}
