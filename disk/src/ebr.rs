//! Extended boot records: the chain of logical partitions inside an
//! extended partition.
//!
//! The chain is headed by a sentinel EBR at the extended partition's first
//! byte (written when the extended partition is created). Every logical
//! partition is a node spliced after it; a node's data region begins
//! `EBR_SIZE` bytes past the node's own offset. The chain is kept ordered
//! by offset and terminates with `next == -1`.

use crate::alloc::{pick_by_fit, Segment};
use crate::mbr::{Fit, STATUS_FREE, STATUS_USED};
use crate::DiskError;
use std::collections::HashSet;
use std::fs::File;
use utils::io;
use utils::io::Record;
use utils::util::trim_name;

/// On-disk overhead of one EBR node.
pub const EBR_SIZE: i64 = 64;

/// Length of a logical partition name field.
pub const EBR_NAME_LEN: usize = 16;

/// One node of the EBR chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ebr {
    /// 0 free, 1 used.
    pub status: u8,
    /// `'F'`, `'B'` or `'W'`.
    pub fit: u8,
    /// Own byte offset from the start of the disk.
    pub start: i64,
    /// Size of the data region, the EBR itself excluded.
    pub size: i64,
    /// Offset of the next EBR, or −1 at the end of the chain.
    pub next: i64,
    pub name: [u8; EBR_NAME_LEN],
}

impl Ebr {
    /// The sentinel node written at the first byte of a new extended
    /// partition.
    pub fn sentinel(start: i64) -> Self {
        Self {
            status: STATUS_FREE,
            fit: Fit::First.as_byte(),
            start,
            size: 0,
            next: -1,
            name: [0; EBR_NAME_LEN],
        }
    }

    pub fn is_used(&self) -> bool {
        self.status == STATUS_USED
    }

    pub fn name_str(&self) -> String {
        trim_name(&self.name)
    }

    /// First byte of the data region.
    pub fn data_start(&self) -> i64 {
        self.start + EBR_SIZE
    }

    /// End (exclusive) of the region occupied by this node: its EBR plus
    /// its data.
    pub fn region_end(&self) -> i64 {
        self.start + EBR_SIZE + self.size
    }
}

impl Record for Ebr {
    const SIZE: usize = EBR_SIZE as usize;

    fn decode(buf: &[u8]) -> Self {
        let mut name = [0u8; EBR_NAME_LEN];
        name.copy_from_slice(&buf[32..48]);
        Self {
            status: buf[0],
            fit: buf[1],
            start: io::get_i64(buf, 8),
            size: io::get_i64(buf, 16),
            next: io::get_i64(buf, 24),
            name,
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[0] = self.status;
        buf[1] = self.fit;
        io::put_i64(buf, 8, self.start);
        io::put_i64(buf, 16, self.size);
        io::put_i64(buf, 24, self.next);
        buf[32..48].copy_from_slice(&self.name);
    }
}

/// Reads the whole chain of the extended partition `[ext_start, ext_end)`.
///
/// Fails with a corruption error on a node outside the extended region, a
/// node whose recorded offset disagrees with its position, or a cycle.
pub fn read_chain(file: &mut File, ext_start: i64, ext_end: i64) -> Result<Vec<Ebr>, DiskError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut off = ext_start;

    while off != -1 {
        if off < ext_start || off + EBR_SIZE > ext_end {
            return Err(DiskError::Corrupt(format!(
                "EBR fuera de la extendida: offset {}",
                off
            )));
        }
        if !visited.insert(off) {
            return Err(DiskError::Corrupt(format!(
                "ciclo en la cadena de EBRs en offset {}",
                off
            )));
        }
        let ebr = Ebr::read_at(file, off as u64)?;
        if ebr.start != off {
            return Err(DiskError::Corrupt(format!(
                "EBR en offset {} dice estar en {}",
                off, ebr.start
            )));
        }
        off = ebr.next;
        chain.push(ebr);
    }
    Ok(chain)
}

/// Returns the used node carrying `name`, if any.
pub fn find_by_name(
    file: &mut File,
    ext_start: i64,
    ext_end: i64,
    name: &str,
) -> Result<Option<Ebr>, DiskError> {
    let chain = read_chain(file, ext_start, ext_end)?;
    Ok(chain
        .into_iter()
        .find(|e| e.is_used() && e.name_str() == name))
}

/// Free gaps between chain nodes, ordered by offset.
fn free_gaps(chain: &[Ebr], ext_end: i64) -> Vec<Segment> {
    let mut gaps = Vec::new();
    for (i, node) in chain.iter().enumerate() {
        let end = match chain.get(i + 1) {
            Some(next) => next.start,
            None => ext_end,
        };
        if node.region_end() < end {
            gaps.push(Segment {
                start: node.region_end(),
                end,
            });
        }
    }
    gaps
}

/// Adds a logical partition of `size` data bytes, picking its place inside
/// the extended region by `fit`. A candidate gap must also hold the new
/// node's own EBR.
pub fn add_logical(
    file: &mut File,
    ext_start: i64,
    ext_end: i64,
    name: [u8; EBR_NAME_LEN],
    size: i64,
    fit: Fit,
) -> Result<(), DiskError> {
    let chain = read_chain(file, ext_start, ext_end)?;
    if chain.is_empty() {
        return Err(DiskError::Corrupt(
            "extendida sin EBR inicial".to_owned(),
        ));
    }

    let gaps = free_gaps(&chain, ext_end);
    let seg = pick_by_fit(&gaps, EBR_SIZE + size, fit).ok_or(DiskError::NoSpace)?;

    // The chain is ordered by offset: the predecessor is the last node
    // before the gap, the successor the first one after it.
    let prev = *chain
        .iter()
        .rev()
        .find(|e| e.start < seg.start)
        .ok_or_else(|| DiskError::Corrupt("hueco antes del EBR inicial".to_owned()))?;
    let next = chain.iter().find(|e| e.start > seg.start);

    let node = Ebr {
        status: STATUS_USED,
        fit: fit.as_byte(),
        start: seg.start,
        size,
        next: next.map_or(-1, |e| e.start),
        name,
    };
    node.write_at(file, seg.start as u64)?;

    let prev = Ebr { next: seg.start, ..prev };
    prev.write_at(file, prev.start as u64)?;
    Ok(())
}

/// Deletes the logical partition carrying `name`: unlinks the node from the
/// chain and marks it free, returning its bytes to the pool. With `full`,
/// the data region is zero-filled as well.
pub fn delete_logical(
    file: &mut File,
    ext_start: i64,
    ext_end: i64,
    name: &str,
    full: bool,
) -> Result<(), DiskError> {
    let chain = read_chain(file, ext_start, ext_end)?;
    let idx = chain
        .iter()
        .position(|e| e.is_used() && e.name_str() == name)
        .ok_or(DiskError::PartitionNotFound)?;

    // The sentinel heads the chain, so a used node always has a predecessor.
    let victim = chain[idx];
    let prev = Ebr {
        next: victim.next,
        ..chain[idx - 1]
    };
    prev.write_at(file, prev.start as u64)?;

    let freed = Ebr {
        status: STATUS_FREE,
        next: -1,
        ..victim
    };
    freed.write_at(file, victim.start as u64)?;

    if full {
        io::zero_range(file, victim.data_start() as u64, victim.size as u64)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use utils::util::pad_name;

    fn temp_ext(len: u64) -> (std::path::PathBuf, File) {
        let path = std::env::temp_dir().join(format!(
            "ebr-test-{}-{}",
            std::process::id(),
            utils::util::timestamp_nanos()
        ));
        io::ensure_size(&path, len).unwrap();
        let file = io::open_rw(&path).unwrap();
        (path, file)
    }

    fn names(chain: &[Ebr]) -> Vec<String> {
        chain
            .iter()
            .filter(|e| e.is_used())
            .map(|e| e.name_str())
            .collect()
    }

    #[test]
    fn logical_chain_reuses_freed_range() {
        const MIB: i64 = 1024 * 1024;
        let ext_start = 0i64;
        let ext_end = 20 * MIB;
        let (path, mut file) = temp_ext(ext_end as u64);
        Ebr::sentinel(ext_start)
            .write_at(&mut file, ext_start as u64)
            .unwrap();

        let l1 = pad_name("L1").unwrap();
        let l2 = pad_name("L2").unwrap();
        let l3 = pad_name("L3").unwrap();
        add_logical(&mut file, ext_start, ext_end, l1, 5 * MIB, Fit::First).unwrap();
        add_logical(&mut file, ext_start, ext_end, l2, 4 * MIB, Fit::First).unwrap();

        let chain = read_chain(&mut file, ext_start, ext_end).unwrap();
        assert_eq!(names(&chain), vec!["L1", "L2"]);
        let l1_start = chain[1].start;
        assert_eq!(l1_start, ext_start + EBR_SIZE);

        delete_logical(&mut file, ext_start, ext_end, "L1", false).unwrap();
        add_logical(&mut file, ext_start, ext_end, l3, 3 * MIB, Fit::First).unwrap();

        // L3's node sits at L1's former offset and precedes L2 in the chain.
        let chain = read_chain(&mut file, ext_start, ext_end).unwrap();
        assert_eq!(names(&chain), vec!["L3", "L2"]);
        assert_eq!(chain[1].start, l1_start);
        assert_eq!(chain[1].size, 3 * MIB);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn full_delete_zeroes_data() {
        let ext_start = 0i64;
        let ext_end = 4096;
        let (path, mut file) = temp_ext(ext_end as u64);
        Ebr::sentinel(ext_start)
            .write_at(&mut file, ext_start as u64)
            .unwrap();

        let name = pad_name("L1").unwrap();
        add_logical(&mut file, ext_start, ext_end, name, 256, Fit::First).unwrap();
        let node = find_by_name(&mut file, ext_start, ext_end, "L1")
            .unwrap()
            .unwrap();
        io::write_all_at(&mut file, node.data_start() as u64, &[0xabu8; 256]).unwrap();

        delete_logical(&mut file, ext_start, ext_end, "L1", true).unwrap();
        let mut buf = [0u8; 256];
        io::read_exact_at(&mut file, node.data_start() as u64, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 256]);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn chain_cycle_is_corruption() {
        let (path, mut file) = temp_ext(4096);
        let mut node = Ebr::sentinel(0);
        node.next = 0;
        node.write_at(&mut file, 0).unwrap();
        assert!(matches!(
            read_chain(&mut file, 0, 4096),
            Err(DiskError::Corrupt(_))
        ));
        std::fs::remove_file(path).unwrap();
    }
}
