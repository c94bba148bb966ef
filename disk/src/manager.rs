//! Disk and partition management: creation, fit allocation, deletion and
//! mounting.

use crate::alloc::{free_primary_segments, pick_by_fit};
use crate::ebr;
use crate::ebr::Ebr;
use crate::mbr::{
    Fit, Mbr, PartType, PartitionSlot, MBR_RESERVED, NAME_LEN, STATUS_USED,
};
use crate::mount_table::{MountTable, PartitionRef};
use crate::DiskError;
use log::info;
use rand_core::{OsRng, RngCore};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use utils::io;
use utils::io::Record;
use utils::util::{pad_name, timestamp};

/// Deletion mode of `fdisk -mode delete`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteMode {
    /// Mark the partition free.
    Fast,
    /// Mark free and zero-fill the data region.
    Full,
}

impl DeleteMode {
    pub fn from_flag(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Some(Self::Fast),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Byte region of a mountable partition inside its disk file. For a
/// logical partition the region excludes the partition's own EBR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionSpan {
    pub start: i64,
    pub size: i64,
}

/// Manages disk image files and the in-memory mount table.
#[derive(Default)]
pub struct DiskManager {
    mounts: MountTable,
}

fn open_disk(path: &Path) -> Result<File, DiskError> {
    io::open_rw(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            DiskError::DiskNotFound
        } else {
            DiskError::Io(e)
        }
    })
}

fn read_mbr(file: &mut File) -> Result<Mbr, DiskError> {
    let len = file.metadata().map_err(DiskError::Io)?.len();
    let mbr = Mbr::read_at(file, 0)?;
    mbr.check(len)?;
    Ok(mbr)
}

impl DiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disk image of exactly `size_bytes` bytes and writes a
    /// fresh MBR. An existing file at `path` is truncated and re-created.
    pub fn mkdisk(&self, path: &Path, size_bytes: i64, fit: Fit) -> Result<(), DiskError> {
        if size_bytes <= 0 {
            return Err(DiskError::InvalidSize);
        }
        if size_bytes < MBR_RESERVED {
            return Err(DiskError::NoSpace);
        }
        io::ensure_size(path, size_bytes as u64)?;
        let mut file = io::open_rw(path)?;

        let signature = OsRng.next_u32() as i32;
        let mbr = Mbr::new(size_bytes, fit, signature, timestamp());
        mbr.write_at(&mut file, 0)?;
        info!(
            "mkdisk {}: {} bytes, fit {}, firma {:#010x}",
            path.display(),
            size_bytes,
            char::from(fit.as_byte()),
            signature
        );
        Ok(())
    }

    /// Deletes a disk image and drops its mounts.
    pub fn rmdisk(&self, path: &Path) -> Result<(), DiskError> {
        std::fs::remove_file(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DiskError::DiskNotFound
            } else {
                DiskError::Io(e)
            }
        })?;
        self.mounts.prune_disk(path);
        info!("rmdisk {}", path.display());
        Ok(())
    }

    /// Adds a partition. Primary/extended partitions take an MBR slot and
    /// their place is picked with the disk's default fit; logical
    /// partitions are spliced into the extended partition's EBR chain using
    /// the requested fit.
    pub fn fdisk_add(
        &self,
        path: &Path,
        name: &str,
        size: i64,
        ptype: PartType,
        fit: Fit,
    ) -> Result<(), DiskError> {
        if size <= 0 {
            return Err(DiskError::InvalidSize);
        }
        let name_field: [u8; NAME_LEN] = pad_name(name).ok_or(DiskError::InvalidParam)?;

        let mut file = open_disk(path)?;
        let mut mbr = read_mbr(&mut file)?;
        if self.name_in_use(&mut file, &mbr, name)? {
            return Err(DiskError::AlreadyExists);
        }

        match ptype {
            PartType::Primary | PartType::Extended => {
                if ptype == PartType::Extended && mbr.find_extended().is_some() {
                    return Err(DiskError::PartitionLimit);
                }
                let idx = mbr.free_slot().ok_or(DiskError::PartitionLimit)?;

                let default_fit =
                    Fit::from_byte(mbr.default_fit).ok_or(DiskError::InvalidParam)?;
                let free = free_primary_segments(&mbr);
                let seg = pick_by_fit(&free, size, default_fit).ok_or(DiskError::NoSpace)?;

                mbr.parts[idx] = PartitionSlot {
                    status: STATUS_USED,
                    ptype: ptype.as_byte(),
                    fit: fit.as_byte(),
                    start: seg.start,
                    size,
                    name: name_field,
                };
                if ptype == PartType::Extended {
                    Ebr::sentinel(seg.start).write_at(&mut file, seg.start as u64)?;
                }
                mbr.write_at(&mut file, 0)?;
                info!(
                    "fdisk add {} '{}': {} bytes en offset {}",
                    char::from(ptype.as_byte()),
                    name,
                    size,
                    seg.start
                );
                Ok(())
            }
            PartType::Logical => {
                let ext = mbr.find_extended().ok_or(DiskError::NoExtended)?;
                ebr::add_logical(&mut file, ext.start, ext.end(), name_field, size, fit)?;
                info!("fdisk add L '{}': {} bytes", name, size);
                Ok(())
            }
        }
    }

    /// Deletes a partition by name, searching the MBR slots first and the
    /// EBR chain second.
    pub fn fdisk_delete(
        &self,
        path: &Path,
        name: &str,
        mode: DeleteMode,
    ) -> Result<(), DiskError> {
        let mut file = open_disk(path)?;
        let mut mbr = read_mbr(&mut file)?;

        if let Some(idx) = mbr.find_by_name(name) {
            let slot = mbr.parts[idx];
            if mode == DeleteMode::Full {
                io::zero_range(&mut file, slot.start as u64, slot.size as u64)?;
            }
            mbr.parts[idx] = PartitionSlot::default();
            mbr.write_at(&mut file, 0)?;
            info!("fdisk delete '{}' ({:?})", name, mode);
            return Ok(());
        }

        let ext = match mbr.find_extended() {
            Some(ext) => *ext,
            None => return Err(DiskError::PartitionNotFound),
        };
        ebr::delete_logical(
            &mut file,
            ext.start,
            ext.end(),
            name,
            mode == DeleteMode::Full,
        )?;
        info!("fdisk delete '{}' ({:?})", name, mode);
        Ok(())
    }

    /// Mounts a partition by name. Extended partitions are not mountable;
    /// logical partitions inside one are.
    pub fn mount(&self, path: &Path, name: &str) -> Result<PartitionRef, DiskError> {
        // Checks existence before touching the table.
        self.locate(path, name)?;
        let r = PartitionRef::new(path, name);
        self.mounts.put(r.clone())?;
        info!("mount {} '{}'", path.display(), name);
        Ok(r)
    }

    /// Unmounts a previously mounted partition.
    pub fn unmount(&self, r: &PartitionRef) -> Result<(), DiskError> {
        self.mounts.del(r)?;
        info!("unmount {} '{}'", r.disk_path.display(), r.name);
        Ok(())
    }

    pub fn mounted(&self) -> Vec<PartitionRef> {
        self.mounts.list()
    }

    pub fn is_mounted(&self, r: &PartitionRef) -> bool {
        self.mounts.contains(r)
    }

    /// Resolves a partition name to its byte region inside the disk file.
    pub fn locate(&self, path: &Path, name: &str) -> Result<PartitionSpan, DiskError> {
        let mut file = open_disk(path)?;
        let mbr = read_mbr(&mut file)?;

        if let Some(idx) = mbr.find_by_name(name) {
            let slot = &mbr.parts[idx];
            if slot.ptype == PartType::Extended.as_byte() {
                // The extended partition itself holds no filesystem.
                return Err(DiskError::InvalidParam);
            }
            return Ok(PartitionSpan {
                start: slot.start,
                size: slot.size,
            });
        }

        let ext = mbr.find_extended().ok_or(DiskError::PartitionNotFound)?;
        let node = ebr::find_by_name(&mut file, ext.start, ext.end(), name)?
            .ok_or(DiskError::PartitionNotFound)?;
        Ok(PartitionSpan {
            start: node.data_start(),
            size: node.size,
        })
    }

    /// Tells whether `name` is taken by any used partition of the disk,
    /// logical partitions included.
    fn name_in_use(
        &self,
        file: &mut File,
        mbr: &Mbr,
        name: &str,
    ) -> Result<bool, DiskError> {
        if mbr.find_by_name(name).is_some() {
            return Ok(true);
        }
        if let Some(ext) = mbr.find_extended() {
            if ebr::find_by_name(file, ext.start, ext.end(), name)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MIB: i64 = 1024 * 1024;

    struct TempDisk(std::path::PathBuf);

    impl TempDisk {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!(
                "manager-test-{}-{}.dsk",
                std::process::id(),
                utils::util::timestamp_nanos()
            )))
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDisk {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn mkdisk_then_add_primary() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 10 * MIB, Fit::First).unwrap();
        dm.fdisk_add(disk.path(), "Part1", 2 * MIB, PartType::Primary, Fit::First)
            .unwrap();

        let mut file = io::open_rw(disk.path()).unwrap();
        let mbr = read_mbr(&mut file).unwrap();
        let used: Vec<_> = mbr.parts.iter().filter(|p| p.is_used()).collect();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].name_str(), "Part1");
        assert_eq!(used[0].start, MBR_RESERVED);
        assert_eq!(used[0].size, 2 * MIB);
    }

    #[test]
    fn best_fit_reuses_freed_hole() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 30 * MIB, Fit::Best).unwrap();
        dm.fdisk_add(disk.path(), "P1", 10 * MIB, PartType::Primary, Fit::Best)
            .unwrap();
        dm.fdisk_add(disk.path(), "P2", 5 * MIB, PartType::Primary, Fit::Best)
            .unwrap();
        dm.fdisk_delete(disk.path(), "P1", DeleteMode::Fast).unwrap();
        dm.fdisk_add(disk.path(), "P3", 4 * MIB, PartType::Primary, Fit::Best)
            .unwrap();

        // Best fit picks the freed 10 MiB hole over the trailing 15 MiB.
        let span = dm.locate(disk.path(), "P3").unwrap();
        assert_eq!(span.start, 512);
        assert_eq!(span.size, 4 * MIB);
    }

    #[test]
    fn duplicate_name_rejected() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 10 * MIB, Fit::First).unwrap();
        dm.fdisk_add(disk.path(), "Part1", MIB, PartType::Primary, Fit::First)
            .unwrap();
        assert!(matches!(
            dm.fdisk_add(disk.path(), "Part1", MIB, PartType::Primary, Fit::First),
            Err(DiskError::AlreadyExists)
        ));
    }

    #[test]
    fn four_slots_maximum() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 10 * MIB, Fit::First).unwrap();
        for name in ["P1", "P2", "P3", "P4"] {
            dm.fdisk_add(disk.path(), name, MIB, PartType::Primary, Fit::First)
                .unwrap();
        }
        assert!(matches!(
            dm.fdisk_add(disk.path(), "P5", MIB, PartType::Primary, Fit::First),
            Err(DiskError::PartitionLimit)
        ));
    }

    #[test]
    fn second_extended_rejected() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 10 * MIB, Fit::First).unwrap();
        dm.fdisk_add(disk.path(), "E1", 2 * MIB, PartType::Extended, Fit::First)
            .unwrap();
        assert!(matches!(
            dm.fdisk_add(disk.path(), "E2", 2 * MIB, PartType::Extended, Fit::First),
            Err(DiskError::PartitionLimit)
        ));
    }

    #[test]
    fn logical_requires_extended() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 10 * MIB, Fit::First).unwrap();
        assert!(matches!(
            dm.fdisk_add(disk.path(), "L1", MIB, PartType::Logical, Fit::First),
            Err(DiskError::NoExtended)
        ));
    }

    #[test]
    fn mount_rules() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 20 * MIB, Fit::First).unwrap();
        dm.fdisk_add(disk.path(), "P1", 2 * MIB, PartType::Primary, Fit::First)
            .unwrap();
        dm.fdisk_add(disk.path(), "E1", 10 * MIB, PartType::Extended, Fit::First)
            .unwrap();
        dm.fdisk_add(disk.path(), "L1", 2 * MIB, PartType::Logical, Fit::First)
            .unwrap();

        let p1 = dm.mount(disk.path(), "P1").unwrap();
        assert!(matches!(
            dm.mount(disk.path(), "P1"),
            Err(DiskError::AlreadyMounted)
        ));
        // Logicals mount; the extended slot itself does not.
        dm.mount(disk.path(), "L1").unwrap();
        assert!(matches!(
            dm.mount(disk.path(), "E1"),
            Err(DiskError::InvalidParam)
        ));
        assert!(matches!(
            dm.mount(disk.path(), "nope"),
            Err(DiskError::PartitionNotFound)
        ));

        assert_eq!(dm.mounted().len(), 2);
        dm.unmount(&p1).unwrap();
        assert!(matches!(dm.unmount(&p1), Err(DiskError::NotMounted)));
    }

    #[test]
    fn logical_span_excludes_its_ebr() {
        let dm = DiskManager::new();
        let disk = TempDisk::new();
        dm.mkdisk(disk.path(), 20 * MIB, Fit::First).unwrap();
        dm.fdisk_add(disk.path(), "E1", 10 * MIB, PartType::Extended, Fit::First)
            .unwrap();
        dm.fdisk_add(disk.path(), "L1", 2 * MIB, PartType::Logical, Fit::First)
            .unwrap();

        let span = dm.locate(disk.path(), "L1").unwrap();
        // Sentinel EBR + the logical's own EBR precede the data region.
        assert_eq!(span.start, MBR_RESERVED + 2 * ebr::EBR_SIZE);
        assert_eq!(span.size, 2 * MIB);
    }
}
