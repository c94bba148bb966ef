//! The 3fs journal: a fixed-capacity circular log of mutation records.
//!
//! The journal region sits right after the superblock and holds exactly
//! 50 entries of 64 bytes. The circular write index is persisted in the
//! superblock (`journal_head`). An entry with `timestamp == 0` is an empty
//! slot. Operations older than the 50-entry window are overwritten and can
//! no longer be recovered.

use utils::io;
use utils::io::Record;
use utils::util::trim_name;

/// Capacity of the journal, fixed by the on-disk format.
pub const JOURNAL_ENTRIES: i32 = 50;

/// Size of one journal entry in bytes.
pub const JOURNAL_ENTRY_SIZE: usize = 64;

/// Total bytes of the journal region.
pub const JOURNAL_BYTES: i64 = JOURNAL_ENTRIES as i64 * JOURNAL_ENTRY_SIZE as i64;

/// Length of the operation tag field.
pub const OP_LEN: usize = 16;
/// Length of the path field. Rename/copy/move record `"from -> to"` here,
/// truncated when longer.
pub const PATH_LEN: usize = 24;
/// Length of the auxiliary payload: a content prefix, permission digits or
/// a user/group spec depending on the operation. Longer payloads are
/// truncated, which bounds what a replay can restore.
pub const AUX_LEN: usize = 8;

fn copy_trunc<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = s.as_bytes();
    let n = bytes.len().min(N);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// One 64-byte journal record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JournalEntry {
    pub operation: [u8; OP_LEN],
    pub path: [u8; PATH_LEN],
    pub aux: [u8; AUX_LEN],
    /// Unix seconds; 0 marks an empty slot.
    pub timestamp: i64,
    pub uid: i32,
    pub gid: i32,
}

impl JournalEntry {
    pub fn new(op: &str, path: &str, aux: &str, timestamp: i64, uid: i32, gid: i32) -> Self {
        Self {
            operation: copy_trunc(op),
            path: copy_trunc(path),
            aux: copy_trunc(aux),
            timestamp,
            uid,
            gid,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp == 0
    }

    pub fn op_str(&self) -> String {
        trim_name(&self.operation)
    }

    pub fn path_str(&self) -> String {
        trim_name(&self.path)
    }

    pub fn aux_str(&self) -> String {
        trim_name(&self.aux)
    }
}

impl Record for JournalEntry {
    const SIZE: usize = JOURNAL_ENTRY_SIZE;

    fn decode(buf: &[u8]) -> Self {
        let mut operation = [0u8; OP_LEN];
        let mut path = [0u8; PATH_LEN];
        let mut aux = [0u8; AUX_LEN];
        operation.copy_from_slice(&buf[0..16]);
        path.copy_from_slice(&buf[16..40]);
        aux.copy_from_slice(&buf[40..48]);
        Self {
            operation,
            path,
            aux,
            timestamp: io::get_i64(buf, 48),
            uid: io::get_i32(buf, 56),
            gid: io::get_i32(buf, 60),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[0..16].copy_from_slice(&self.operation);
        buf[16..40].copy_from_slice(&self.path);
        buf[40..48].copy_from_slice(&self.aux);
        io::put_i64(buf, 48, self.timestamp);
        io::put_i32(buf, 56, self.uid);
        io::put_i32(buf, 60, self.gid);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entry_roundtrip() {
        let e = JournalEntry::new("mkfile", "/a/b", "zz", 1_700_000_000, 1, 1);
        let mut buf = [0u8; JournalEntry::SIZE];
        e.encode(&mut buf);
        let back = JournalEntry::decode(&buf);
        assert_eq!(back, e);
        assert_eq!(back.op_str(), "mkfile");
        assert_eq!(back.path_str(), "/a/b");
        assert_eq!(back.aux_str(), "zz");
        assert!(!back.is_empty());
    }

    #[test]
    fn long_fields_truncate() {
        let e = JournalEntry::new(
            "rename",
            "/una/ruta/muy/larga -> /otra/ruta",
            "contenido largo",
            1,
            1,
            1,
        );
        assert_eq!(e.path_str().len(), PATH_LEN);
        assert_eq!(e.aux_str().len(), AUX_LEN);
    }

    #[test]
    fn region_size() {
        assert_eq!(JOURNAL_BYTES, 3200);
    }
}
