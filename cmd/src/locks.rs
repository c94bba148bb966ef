//! Per-partition serialisation.
//!
//! Every disk mutation for a given partition runs with that partition's
//! mutex held for the whole operation; two different partitions may be
//! mutated in parallel.

use disk::PartitionRef;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct LockTable {
    locks: Mutex<HashMap<(PathBuf, String), Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex of one partition, creating it on first use. The
    /// caller holds the returned lock for the whole operation.
    pub fn for_partition(&self, r: &PartitionRef) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry((r.disk_path.clone(), r.name.clone()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    #[test]
    fn same_partition_same_lock() {
        let table = LockTable::new();
        let a = table.for_partition(&PartitionRef::new(Path::new("/tmp/a"), "P1"));
        let b = table.for_partition(&PartitionRef::new(Path::new("/tmp/a"), "P1"));
        let c = table.for_partition(&PartitionRef::new(Path::new("/tmp/a"), "P2"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
