//! The superblock and the derivation of the filesystem geometry from the
//! partition size.
//!
//! Layout of a formatted partition, left to right:
//! superblock (512 bytes reserved), journal (3fs only, 50 × 64 bytes),
//! inode bitmap (`n` bytes), block bitmap (`3n` bytes), inode table
//! (`n` × 128 bytes), block area (`3n` × block size). Bitmaps use one byte
//! per slot. All offsets recorded in the superblock are relative to the
//! partition start.

use crate::journal::JOURNAL_BYTES;
use crate::FsError;
use utils::io;
use utils::io::Record;

/// Filesystem magic number.
pub const MAGIC: i32 = 0xEF53;

/// Bytes reserved for the superblock at the partition start.
pub const SUPERBLOCK_RESERVED: i64 = 512;

/// On-disk size of an inode.
pub const INODE_SIZE: i64 = 128;

/// Block size of a 2fs partition.
pub const BLOCK_SIZE_2FS: i64 = 64;

/// Default block size of a 3fs partition.
pub const DEFAULT_BLOCK_SIZE_3FS: i64 = 128;

/// Minimum inode count accepted by the layout engine.
pub const MIN_INODES: i64 = 2;

/// The two filesystem variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsKind {
    Fs2,
    Fs3,
}

impl FsKind {
    /// Parses the `-fs` flag value (`2fs`/`3fs`).
    pub fn from_flag(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "2fs" => Some(Self::Fs2),
            "3fs" => Some(Self::Fs3),
            _ => None,
        }
    }

    /// Type tag stored in the superblock.
    pub fn tag(self) -> i32 {
        match self {
            Self::Fs2 => 2,
            Self::Fs3 => 3,
        }
    }

    /// Bytes reserved for the journal region.
    pub fn journal_bytes(self) -> i64 {
        match self {
            Self::Fs2 => 0,
            Self::Fs3 => JOURNAL_BYTES,
        }
    }
}

impl std::fmt::Display for FsKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fs2 => write!(fmt, "2fs"),
            Self::Fs3 => write!(fmt, "3fs"),
        }
    }
}

/// Number of inodes that fit a partition of `part_size` bytes:
/// `n = floor((S − superblock − journal) / (1 + 3 + inode + 3·B))`,
/// one bitmap byte per inode, three per block.
pub fn calc_inode_count(part_size: i64, block_size: i64, journal_bytes: i64) -> i64 {
    let available = part_size - SUPERBLOCK_RESERVED - journal_bytes;
    let per_inode = 1 + 3 + INODE_SIZE + 3 * block_size;
    if available <= 0 {
        return 0;
    }
    available / per_inode
}

/// The superblock written at the start of a formatted partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Superblock {
    /// 2 or 3.
    pub fs_type: i32,
    /// `n`.
    pub inode_count: i32,
    /// `3n`.
    pub block_count: i32,
    pub free_inodes: i32,
    pub free_blocks: i32,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Last mount time, unix seconds (0 when never mounted).
    pub mounted_at: i64,
    pub mount_count: i32,
    pub magic: i32,
    pub inode_size: i32,
    pub block_size: i32,
    /// Scan hints for the allocators.
    pub first_free_inode: i32,
    pub first_free_block: i32,
    /// Region offsets, relative to the partition start.
    pub bm_inode_start: i64,
    pub bm_block_start: i64,
    pub inode_start: i64,
    pub block_start: i64,
    /// Journal region (3fs only; 0 on 2fs).
    pub journal_start: i64,
    pub journal_count: i32,
    /// Circular write index of the journal, persisted here so the journal
    /// region itself stays exactly `journal_count × 64` bytes.
    pub journal_head: i32,
}

impl Superblock {
    /// Computes the geometry for a partition of `part_size` bytes and
    /// returns the fully laid out superblock with everything still free.
    pub fn build(
        kind: FsKind,
        part_size: i64,
        block_size: i64,
        now: i64,
    ) -> Result<Self, FsError> {
        if block_size <= 0 {
            return Err(FsError::InvalidParam);
        }
        let n = calc_inode_count(part_size, block_size, kind.journal_bytes());
        if n < MIN_INODES {
            return Err(FsError::NoSpace);
        }

        let mut off = SUPERBLOCK_RESERVED;
        let journal_start = if kind == FsKind::Fs3 { off } else { 0 };
        off += kind.journal_bytes();
        let bm_inode_start = off;
        off += n;
        let bm_block_start = off;
        off += 3 * n;
        let inode_start = off;
        off += n * INODE_SIZE;
        let block_start = off;

        Ok(Self {
            fs_type: kind.tag(),
            inode_count: n as i32,
            block_count: (3 * n) as i32,
            free_inodes: n as i32,
            free_blocks: (3 * n) as i32,
            created_at: now,
            mounted_at: 0,
            mount_count: 0,
            magic: MAGIC,
            inode_size: INODE_SIZE as i32,
            block_size: block_size as i32,
            first_free_inode: 0,
            first_free_block: 0,
            bm_inode_start,
            bm_block_start,
            inode_start,
            block_start,
            journal_start,
            journal_count: if kind == FsKind::Fs3 {
                crate::journal::JOURNAL_ENTRIES
            } else {
                0
            },
            journal_head: 0,
        })
    }

    pub fn kind(&self) -> Result<FsKind, FsError> {
        match self.fs_type {
            2 => Ok(FsKind::Fs2),
            3 => Ok(FsKind::Fs3),
            t => Err(FsError::Corrupt(format!("tipo de filesystem desconocido: {}", t))),
        }
    }

    /// Validates magic, counters and region offsets.
    pub fn check(&self) -> Result<(), FsError> {
        if self.magic != MAGIC {
            return Err(FsError::Corrupt(format!(
                "magic inválido: {:#x}",
                self.magic
            )));
        }
        let kind = self.kind()?;
        let n = self.inode_count as i64;
        if n < MIN_INODES || self.block_count as i64 != 3 * n {
            return Err(FsError::Corrupt(format!(
                "conteos inválidos: {} inodos, {} bloques",
                self.inode_count, self.block_count
            )));
        }
        if self.free_inodes < 0
            || self.free_inodes > self.inode_count
            || self.free_blocks < 0
            || self.free_blocks > self.block_count
        {
            return Err(FsError::Corrupt(format!(
                "contadores libres fuera de rango: {}/{}",
                self.free_inodes, self.free_blocks
            )));
        }
        // Offsets must agree with the sizes of the regions before them.
        let bm_inode = SUPERBLOCK_RESERVED + kind.journal_bytes();
        let bm_block = bm_inode + n;
        let inode_start = bm_block + 3 * n;
        let block_start = inode_start + n * INODE_SIZE;
        if self.bm_inode_start != bm_inode
            || self.bm_block_start != bm_block
            || self.inode_start != inode_start
            || self.block_start != block_start
        {
            return Err(FsError::Corrupt(
                "offsets de regiones no concuerdan con los tamaños".to_owned(),
            ));
        }
        if kind == FsKind::Fs3
            && (self.journal_head < 0 || self.journal_head >= self.journal_count)
        {
            return Err(FsError::Corrupt(format!(
                "índice de journal fuera de rango: {}",
                self.journal_head
            )));
        }
        Ok(())
    }
}

impl Record for Superblock {
    const SIZE: usize = 108;

    fn decode(buf: &[u8]) -> Self {
        Self {
            fs_type: io::get_i32(buf, 0),
            inode_count: io::get_i32(buf, 4),
            block_count: io::get_i32(buf, 8),
            free_inodes: io::get_i32(buf, 12),
            free_blocks: io::get_i32(buf, 16),
            created_at: io::get_i64(buf, 20),
            mounted_at: io::get_i64(buf, 28),
            mount_count: io::get_i32(buf, 36),
            magic: io::get_i32(buf, 40),
            inode_size: io::get_i32(buf, 44),
            block_size: io::get_i32(buf, 48),
            first_free_inode: io::get_i32(buf, 52),
            first_free_block: io::get_i32(buf, 56),
            bm_inode_start: io::get_i64(buf, 60),
            bm_block_start: io::get_i64(buf, 68),
            inode_start: io::get_i64(buf, 76),
            block_start: io::get_i64(buf, 84),
            journal_start: io::get_i64(buf, 92),
            journal_count: io::get_i32(buf, 100),
            journal_head: io::get_i32(buf, 104),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        io::put_i32(buf, 0, self.fs_type);
        io::put_i32(buf, 4, self.inode_count);
        io::put_i32(buf, 8, self.block_count);
        io::put_i32(buf, 12, self.free_inodes);
        io::put_i32(buf, 16, self.free_blocks);
        io::put_i64(buf, 20, self.created_at);
        io::put_i64(buf, 28, self.mounted_at);
        io::put_i32(buf, 36, self.mount_count);
        io::put_i32(buf, 40, self.magic);
        io::put_i32(buf, 44, self.inode_size);
        io::put_i32(buf, 48, self.block_size);
        io::put_i32(buf, 52, self.first_free_inode);
        io::put_i32(buf, 56, self.first_free_block);
        io::put_i64(buf, 60, self.bm_inode_start);
        io::put_i64(buf, 68, self.bm_block_start);
        io::put_i64(buf, 76, self.inode_start);
        io::put_i64(buf, 84, self.block_start);
        io::put_i64(buf, 92, self.journal_start);
        io::put_i32(buf, 100, self.journal_count);
        io::put_i32(buf, 104, self.journal_head);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MIB: i64 = 1024 * 1024;

    #[test]
    fn inode_count_10mib_2fs() {
        // floor((10·1024·1024 − 512) / 324) = 32361
        let n = calc_inode_count(10 * MIB, BLOCK_SIZE_2FS, 0);
        assert_eq!(n, 32361);
    }

    #[test]
    fn build_2fs_layout() {
        let sb = Superblock::build(FsKind::Fs2, 10 * MIB, BLOCK_SIZE_2FS, 1_700_000_000).unwrap();
        assert_eq!(sb.inode_count, 32361);
        assert_eq!(sb.block_count, 97083);
        assert_eq!(sb.bm_inode_start, 512);
        assert_eq!(sb.bm_block_start, 512 + 32361);
        assert_eq!(sb.inode_start, 512 + 32361 + 97083);
        assert_eq!(sb.block_start, 512 + 32361 + 97083 + 32361 * 128);
        assert_eq!(sb.journal_start, 0);
        sb.check().unwrap();
    }

    #[test]
    fn build_3fs_reserves_journal() {
        let sb =
            Superblock::build(FsKind::Fs3, 10 * MIB, DEFAULT_BLOCK_SIZE_3FS, 1_700_000_000)
                .unwrap();
        assert_eq!(sb.fs_type, 3);
        assert_eq!(sb.journal_start, 512);
        assert_eq!(sb.journal_count, 50);
        assert_eq!(sb.bm_inode_start, 512 + 3200);
        let n = calc_inode_count(10 * MIB, DEFAULT_BLOCK_SIZE_3FS, 3200);
        assert_eq!(sb.inode_count as i64, n);
        sb.check().unwrap();
    }

    #[test]
    fn tiny_partition_rejected() {
        assert!(matches!(
            Superblock::build(FsKind::Fs2, 600, BLOCK_SIZE_2FS, 0),
            Err(FsError::NoSpace)
        ));
    }

    #[test]
    fn roundtrip() {
        let sb = Superblock::build(FsKind::Fs3, 10 * MIB, 128, 42).unwrap();
        let mut buf = [0u8; Superblock::SIZE];
        sb.encode(&mut buf);
        assert_eq!(Superblock::decode(&buf), sb);
    }
}
