//! In-memory registry of mounted partitions.

use crate::DiskError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Identifies one mounted partition: the disk image and the partition name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartitionRef {
    pub disk_path: PathBuf,
    pub name: String,
}

impl PartitionRef {
    pub fn new(disk_path: &Path, name: &str) -> Self {
        Self {
            disk_path: disk_path.to_path_buf(),
            name: name.to_owned(),
        }
    }
}

/// Thread-safe mount registry keyed by `(disk path, partition name)`.
#[derive(Default)]
pub struct MountTable {
    set: RwLock<HashMap<(PathBuf, String), PartitionRef>>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mount. Mounting the same partition twice fails.
    pub fn put(&self, r: PartitionRef) -> Result<(), DiskError> {
        let mut set = self.set.write().unwrap();
        let key = (r.disk_path.clone(), r.name.clone());
        if set.contains_key(&key) {
            return Err(DiskError::AlreadyMounted);
        }
        set.insert(key, r);
        Ok(())
    }

    /// Removes a mount; fails when it is not registered.
    pub fn del(&self, r: &PartitionRef) -> Result<(), DiskError> {
        let mut set = self.set.write().unwrap();
        set.remove(&(r.disk_path.clone(), r.name.clone()))
            .map(|_| ())
            .ok_or(DiskError::NotMounted)
    }

    pub fn contains(&self, r: &PartitionRef) -> bool {
        self.set
            .read()
            .unwrap()
            .contains_key(&(r.disk_path.clone(), r.name.clone()))
    }

    pub fn list(&self) -> Vec<PartitionRef> {
        let mut out: Vec<_> = self.set.read().unwrap().values().cloned().collect();
        out.sort_by(|a, b| (&a.disk_path, &a.name).cmp(&(&b.disk_path, &b.name)));
        out
    }

    /// Drops every mount of the given disk (used when the disk is deleted).
    pub fn prune_disk(&self, disk_path: &Path) {
        self.set
            .write()
            .unwrap()
            .retain(|(path, _), _| path != disk_path);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn double_mount_fails() {
        let table = MountTable::new();
        let r = PartitionRef::new(Path::new("/tmp/a.dsk"), "Part1");
        table.put(r.clone()).unwrap();
        assert!(matches!(
            table.put(r.clone()),
            Err(DiskError::AlreadyMounted)
        ));
        table.del(&r).unwrap();
        assert!(matches!(table.del(&r), Err(DiskError::NotMounted)));
    }

    #[test]
    fn prune_removes_disk_mounts() {
        let table = MountTable::new();
        table
            .put(PartitionRef::new(Path::new("/tmp/a.dsk"), "P1"))
            .unwrap();
        table
            .put(PartitionRef::new(Path::new("/tmp/b.dsk"), "P1"))
            .unwrap();
        table.prune_disk(Path::new("/tmp/a.dsk"));
        let left = table.list();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].disk_path, Path::new("/tmp/b.dsk"));
    }
}
