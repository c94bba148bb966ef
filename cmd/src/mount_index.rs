//! The mount index: human-stable ids for mounted partitions.
//!
//! Ids concatenate a fixed 2-digit user tag, a per-disk sequence number
//! and a per-disk letter assigned in first-seen order: the first
//! partition mounted from the first disk is `841A`, the second from the
//! same disk `842A`, the first from another disk `841B`.

use disk::PartitionRef;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use vfs::FsKind;

/// Fixed tag prefixing every mount id.
pub const USER_TAG: &str = "84";

#[derive(Default)]
struct Inner {
    refs: HashMap<String, PartitionRef>,
    kinds: HashMap<String, FsKind>,
    disk_letter: HashMap<PathBuf, char>,
    disk_seq: HashMap<PathBuf, u32>,
}

/// Thread-safe id ↔ partition mapping, plus the fs kind recorded at
/// `mkfs` time.
#[derive(Default)]
pub struct MountIndex {
    inner: RwLock<Inner>,
}

impl MountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates the id for a new mount of `disk_path` and registers the
    /// partition under it.
    pub fn put(&self, r: PartitionRef) -> String {
        let mut inner = self.inner.write().unwrap();
        let next_letter = (b'A' + inner.disk_letter.len() as u8) as char;
        let letter = *inner
            .disk_letter
            .entry(r.disk_path.clone())
            .or_insert(next_letter);
        let seq = inner.disk_seq.entry(r.disk_path.clone()).or_insert(0);
        *seq += 1;
        let id = format!("{}{}{}", USER_TAG, seq, letter);
        inner.refs.insert(id.clone(), r);
        id
    }

    pub fn get(&self, id: &str) -> Option<PartitionRef> {
        self.inner.read().unwrap().refs.get(id).cloned()
    }

    pub fn del(&self, id: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.refs.remove(id);
        inner.kinds.remove(id);
    }

    /// Records the fs kind chosen at `mkfs` time.
    pub fn set_kind(&self, id: &str, kind: FsKind) {
        self.inner
            .write()
            .unwrap()
            .kinds
            .insert(id.to_owned(), kind);
    }

    pub fn kind(&self, id: &str) -> Option<FsKind> {
        self.inner.read().unwrap().kinds.get(id).copied()
    }

    /// All mounts, ordered by id.
    pub fn list(&self) -> Vec<(String, PartitionRef)> {
        let inner = self.inner.read().unwrap();
        let mut out: Vec<_> = inner
            .refs
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Clears every mapping and both counters, so ids are predictable on
    /// the next run.
    pub fn reset(&self) {
        *self.inner.write().unwrap() = Inner::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    fn part(disk: &str, name: &str) -> PartitionRef {
        PartitionRef::new(Path::new(disk), name)
    }

    #[test]
    fn id_sequence_per_disk() {
        let index = MountIndex::new();
        assert_eq!(index.put(part("/tmp/a.dsk", "P1")), "841A");
        assert_eq!(index.put(part("/tmp/a.dsk", "P2")), "842A");
        assert_eq!(index.put(part("/tmp/b.dsk", "P1")), "841B");
        assert_eq!(index.put(part("/tmp/a.dsk", "P3")), "843A");

        assert_eq!(index.get("842A").unwrap().name, "P2");
        assert!(index.get("849Z").is_none());
    }

    #[test]
    fn reset_restarts_counters() {
        let index = MountIndex::new();
        index.put(part("/tmp/a.dsk", "P1"));
        index.set_kind("841A", FsKind::Fs2);
        index.reset();
        assert!(index.get("841A").is_none());
        assert!(index.kind("841A").is_none());
        assert_eq!(index.put(part("/tmp/b.dsk", "P1")), "841A");
    }
}
