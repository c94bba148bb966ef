//! An opened, formatted partition.
//!
//! A `Volume` is created per operation: it resolves the partition's byte
//! region through the partitioner, reads and validates the superblock, and
//! exposes the allocators, the inode/block accessors, the logical-to-
//! physical block mapping and the directory primitives the operations are
//! built from. The host file handle is dropped when the operation ends.

use crate::block::{FolderBlock, PointerBlock, ENTRY_NAME_LEN};
use crate::inode::{
    Inode, DIRECT_POINTERS, DOUBLE_INDIRECT, SINGLE_INDIRECT, TRIPLE_INDIRECT,
};
use crate::journal::{JournalEntry, JOURNAL_ENTRY_SIZE};
use crate::superblock::{FsKind, Superblock, SUPERBLOCK_RESERVED};
use crate::FsError;
use disk::{DiskError, DiskManager, PartitionRef};
use std::fs::File;
use std::io::ErrorKind;
use utils::io;
use utils::io::Record;

/// Pointers per pointer block.
const P: usize = crate::block::BLOCK_POINTERS;

/// Bitmap bytes scanned per read while looking for a free slot.
const SCAN_CHUNK: usize = 1024;

/// Decomposes a logical block index into the inode pointer slot and the
/// chain of pointer-block slots leading to the data block.
fn block_route(logical: usize) -> Option<(usize, Vec<usize>)> {
    if logical < DIRECT_POINTERS {
        return Some((logical, Vec::new()));
    }
    let l = logical - DIRECT_POINTERS;
    if l < P {
        return Some((SINGLE_INDIRECT, vec![l]));
    }
    let l = l - P;
    if l < P * P {
        return Some((DOUBLE_INDIRECT, vec![l / P, l % P]));
    }
    let l = l - P * P;
    if l < P * P * P {
        return Some((TRIPLE_INDIRECT, vec![l / (P * P), (l / P) % P, l % P]));
    }
    None
}

pub struct Volume {
    file: File,
    /// Byte offset of the partition inside the disk file.
    start: i64,
    /// Partition size in bytes.
    size: i64,
    pub sb: Superblock,
}

impl Volume {
    /// Opens a formatted partition, validating its superblock.
    pub fn open(dm: &DiskManager, part: &PartitionRef) -> Result<Self, FsError> {
        let span = dm.locate(&part.disk_path, &part.name)?;
        let mut file = io::open_rw(&part.disk_path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                FsError::Disk(DiskError::DiskNotFound)
            } else {
                FsError::Io(e)
            }
        })?;
        let sb = Superblock::read_at(&mut file, span.start as u64)?;
        sb.check()?;
        Ok(Self {
            file,
            start: span.start,
            size: span.size,
            sb,
        })
    }

    /// Wraps an already-located partition region (used while formatting,
    /// before a valid superblock exists on disk).
    pub(crate) fn from_parts(file: File, start: i64, size: i64, sb: Superblock) -> Self {
        Self {
            file,
            start,
            size,
            sb,
        }
    }

    pub fn kind(&self) -> Result<FsKind, FsError> {
        self.sb.kind()
    }

    pub fn block_size(&self) -> i64 {
        self.sb.block_size as i64
    }

    pub fn partition_size(&self) -> i64 {
        self.size
    }

    fn abs(&self, rel: i64) -> u64 {
        (self.start + rel) as u64
    }

    /// Persists the in-memory superblock.
    pub fn flush_sb(&mut self) -> Result<(), FsError> {
        self.sb.write_at(&mut self.file, self.start as u64)?;
        Ok(())
    }

    // ---- bitmaps (one byte per slot) ----

    fn bitmap_get(&mut self, bm_start: i64, idx: i32) -> Result<bool, FsError> {
        let off = self.abs(bm_start + idx as i64);
        let mut byte = [0u8; 1];
        io::read_exact_at(&mut self.file, off, &mut byte)?;
        Ok(byte[0] != 0)
    }

    fn bitmap_set(&mut self, bm_start: i64, idx: i32, used: bool) -> Result<(), FsError> {
        let off = self.abs(bm_start + idx as i64);
        io::write_all_at(&mut self.file, off, &[used as u8])?;
        Ok(())
    }

    /// Scans a bitmap for the first free slot, starting at `hint` and
    /// wrapping around.
    fn bitmap_scan(&mut self, bm_start: i64, len: i32, hint: i32) -> Result<Option<i32>, FsError> {
        let hint = if (0..len).contains(&hint) { hint } else { 0 };
        let mut scanned = 0i32;
        let mut pos = hint;
        while scanned < len {
            let chunk = (SCAN_CHUNK as i32).min(len - pos).min(len - scanned);
            let off = self.abs(bm_start + pos as i64);
            let mut buf = vec![0u8; chunk as usize];
            io::read_exact_at(&mut self.file, off, &mut buf)?;
            if let Some(i) = buf.iter().position(|&b| b == 0) {
                return Ok(Some(pos + i as i32));
            }
            scanned += chunk;
            pos += chunk;
            if pos >= len {
                pos = 0;
            }
        }
        Ok(None)
    }

    pub fn inode_used(&mut self, idx: i32) -> Result<bool, FsError> {
        self.check_inode_idx(idx)?;
        self.bitmap_get(self.sb.bm_inode_start, idx)
    }

    pub fn block_used(&mut self, idx: i32) -> Result<bool, FsError> {
        self.check_block_idx(idx)?;
        self.bitmap_get(self.sb.bm_block_start, idx)
    }

    /// Allocates the first free inode, pairing the bitmap write with the
    /// superblock counters.
    pub fn alloc_inode(&mut self) -> Result<i32, FsError> {
        let idx = self
            .bitmap_scan(
                self.sb.bm_inode_start,
                self.sb.inode_count,
                self.sb.first_free_inode,
            )?
            .ok_or(FsError::NoSpace)?;
        self.bitmap_set(self.sb.bm_inode_start, idx, true)?;
        self.sb.free_inodes -= 1;
        self.sb.first_free_inode = idx + 1;
        self.flush_sb()?;
        Ok(idx)
    }

    pub fn free_inode(&mut self, idx: i32) -> Result<(), FsError> {
        self.check_inode_idx(idx)?;
        self.bitmap_set(self.sb.bm_inode_start, idx, false)?;
        self.sb.free_inodes += 1;
        self.sb.first_free_inode = self.sb.first_free_inode.min(idx);
        self.flush_sb()
    }

    pub fn alloc_block(&mut self) -> Result<i32, FsError> {
        let idx = self
            .bitmap_scan(
                self.sb.bm_block_start,
                self.sb.block_count,
                self.sb.first_free_block,
            )?
            .ok_or(FsError::NoSpace)?;
        self.bitmap_set(self.sb.bm_block_start, idx, true)?;
        self.sb.free_blocks -= 1;
        self.sb.first_free_block = idx + 1;
        self.flush_sb()?;
        Ok(idx)
    }

    pub fn free_block(&mut self, idx: i32) -> Result<(), FsError> {
        self.check_block_idx(idx)?;
        self.bitmap_set(self.sb.bm_block_start, idx, false)?;
        self.sb.free_blocks += 1;
        self.sb.first_free_block = self.sb.first_free_block.min(idx);
        self.flush_sb()
    }

    // ---- inode table and block area ----

    fn check_inode_idx(&self, idx: i32) -> Result<(), FsError> {
        if (0..self.sb.inode_count).contains(&idx) {
            Ok(())
        } else {
            Err(FsError::Corrupt(format!("índice de inodo fuera de rango: {}", idx)))
        }
    }

    fn check_block_idx(&self, idx: i32) -> Result<(), FsError> {
        if (0..self.sb.block_count).contains(&idx) {
            Ok(())
        } else {
            Err(FsError::Corrupt(format!("índice de bloque fuera de rango: {}", idx)))
        }
    }

    fn inode_off(&self, idx: i32) -> i64 {
        self.sb.inode_start + idx as i64 * self.sb.inode_size as i64
    }

    fn block_off(&self, idx: i32) -> i64 {
        self.sb.block_start + idx as i64 * self.block_size()
    }

    pub fn read_inode(&mut self, idx: i32) -> Result<Inode, FsError> {
        self.check_inode_idx(idx)?;
        let off = self.abs(self.inode_off(idx));
        Ok(Inode::read_at(&mut self.file, off)?)
    }

    pub fn write_inode(&mut self, idx: i32, inode: &Inode) -> Result<(), FsError> {
        self.check_inode_idx(idx)?;
        let off = self.abs(self.inode_off(idx));
        inode.write_at(&mut self.file, off)?;
        Ok(())
    }

    pub fn read_folder(&mut self, block: i32) -> Result<FolderBlock, FsError> {
        self.check_block_idx(block)?;
        let off = self.abs(self.block_off(block));
        Ok(FolderBlock::read_at(&mut self.file, off)?)
    }

    pub fn write_folder(&mut self, block: i32, fb: &FolderBlock) -> Result<(), FsError> {
        self.check_block_idx(block)?;
        let off = self.abs(self.block_off(block));
        fb.write_at(&mut self.file, off)?;
        Ok(())
    }

    pub fn read_pointer(&mut self, block: i32) -> Result<PointerBlock, FsError> {
        self.check_block_idx(block)?;
        let off = self.abs(self.block_off(block));
        Ok(PointerBlock::read_at(&mut self.file, off)?)
    }

    pub fn write_pointer(&mut self, block: i32, pb: &PointerBlock) -> Result<(), FsError> {
        self.check_block_idx(block)?;
        let off = self.abs(self.block_off(block));
        pb.write_at(&mut self.file, off)?;
        Ok(())
    }

    /// Reads a raw file block (`block_size` bytes).
    pub fn read_file_block(&mut self, block: i32) -> Result<Vec<u8>, FsError> {
        self.check_block_idx(block)?;
        let off = self.abs(self.block_off(block));
        let mut buf = vec![0u8; self.block_size() as usize];
        io::read_exact_at(&mut self.file, off, &mut buf)?;
        Ok(buf)
    }

    /// Writes a raw file block, zero-padding `data` to `block_size`.
    pub fn write_file_block(&mut self, block: i32, data: &[u8]) -> Result<(), FsError> {
        self.check_block_idx(block)?;
        let off = self.abs(self.block_off(block));
        let mut buf = vec![0u8; self.block_size() as usize];
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        io::write_all_at(&mut self.file, off, &buf)?;
        Ok(())
    }

    // ---- logical block mapping ----

    /// Maps a logical block index of `inode` to its physical block, or
    /// `None` when not allocated.
    pub fn map_block(&mut self, inode: &Inode, logical: usize) -> Result<Option<i32>, FsError> {
        let (slot, route) = match block_route(logical) {
            Some(r) => r,
            None => return Ok(None),
        };
        let mut cur = inode.i_block[slot];
        for &step in &route {
            if cur == -1 {
                return Ok(None);
            }
            cur = self.read_pointer(cur)?.ptrs[step];
        }
        Ok((cur != -1).then_some(cur))
    }

    /// Maps a logical block index, allocating the data block and any
    /// missing pointer blocks on the way. The caller persists the inode.
    pub fn map_or_alloc(&mut self, inode: &mut Inode, logical: usize) -> Result<i32, FsError> {
        let (slot, route) = block_route(logical).ok_or(FsError::NoSpace)?;
        if inode.i_block[slot] == -1 {
            let b = self.alloc_block()?;
            if !route.is_empty() {
                self.write_pointer(b, &PointerBlock::empty())?;
            }
            inode.i_block[slot] = b;
        }
        let mut cur = inode.i_block[slot];
        for (depth, &step) in route.iter().enumerate() {
            let mut pb = self.read_pointer(cur)?;
            if pb.ptrs[step] == -1 {
                let b = self.alloc_block()?;
                if depth + 1 < route.len() {
                    self.write_pointer(b, &PointerBlock::empty())?;
                }
                pb.ptrs[step] = b;
                self.write_pointer(cur, &pb)?;
            }
            cur = pb.ptrs[step];
        }
        Ok(cur)
    }

    fn walk_pointers(
        &mut self,
        block: i32,
        depth: usize,
        out: &mut Vec<i32>,
    ) -> Result<(), FsError> {
        if depth == 0 {
            out.push(block);
            return Ok(());
        }
        let pb = self.read_pointer(block)?;
        for ptr in pb.ptrs {
            if ptr != -1 {
                self.walk_pointers(ptr, depth - 1, out)?;
            }
        }
        Ok(())
    }

    /// All allocated data blocks of `inode`, in logical order. Pointer
    /// blocks are not included.
    pub fn collect_blocks(&mut self, inode: &Inode) -> Result<Vec<i32>, FsError> {
        let mut out = Vec::new();
        for slot in 0..DIRECT_POINTERS {
            if inode.i_block[slot] != -1 {
                out.push(inode.i_block[slot]);
            }
        }
        for (slot, depth) in [
            (SINGLE_INDIRECT, 1),
            (DOUBLE_INDIRECT, 2),
            (TRIPLE_INDIRECT, 3),
        ] {
            if inode.i_block[slot] != -1 {
                self.walk_pointers(inode.i_block[slot], depth, &mut out)?;
            }
        }
        Ok(out)
    }

    fn free_pointer_tree(&mut self, block: i32, depth: usize) -> Result<(), FsError> {
        if depth > 0 {
            let pb = self.read_pointer(block)?;
            for ptr in pb.ptrs {
                if ptr != -1 {
                    self.free_pointer_tree(ptr, depth - 1)?;
                }
            }
        }
        self.free_block(block)
    }

    /// Frees every data and pointer block of `inode` and clears its
    /// pointer array. The caller persists the inode.
    pub fn free_all_blocks(&mut self, inode: &mut Inode) -> Result<(), FsError> {
        for slot in 0..DIRECT_POINTERS {
            if inode.i_block[slot] != -1 {
                self.free_block(inode.i_block[slot])?;
            }
        }
        for (slot, depth) in [
            (SINGLE_INDIRECT, 1),
            (DOUBLE_INDIRECT, 2),
            (TRIPLE_INDIRECT, 3),
        ] {
            if inode.i_block[slot] != -1 {
                self.free_pointer_tree(inode.i_block[slot], depth)?;
            }
        }
        inode.i_block = [-1; crate::inode::INODE_POINTERS];
        Ok(())
    }

    // ---- directories ----

    /// Entries of the directory inode `dir_idx`, `.` and `..` included.
    pub fn dir_entries(&mut self, dir_idx: i32) -> Result<Vec<(String, i32)>, FsError> {
        let inode = self.read_inode(dir_idx)?;
        if !inode.is_dir() {
            return Err(FsError::DirNotFound);
        }
        let mut out = Vec::new();
        for block in self.collect_blocks(&inode)? {
            let fb = self.read_folder(block)?;
            for entry in fb.used() {
                out.push((entry.name_str(), entry.inode));
            }
        }
        Ok(out)
    }

    /// Looks `name` up inside the directory `dir`.
    pub fn dir_find(&mut self, dir: &Inode, name: &str) -> Result<Option<i32>, FsError> {
        for block in self.collect_blocks(dir)? {
            if let Some(child) = self.read_folder(block)?.find(name) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Adds `name → child` to the directory `dir_idx`, allocating a new
    /// folder block when the existing ones are full.
    pub fn add_entry(&mut self, dir_idx: i32, name: &str, child: i32) -> Result<(), FsError> {
        if name.len() > ENTRY_NAME_LEN {
            return Err(FsError::InvalidParam);
        }
        let name_field = utils::util::pad_name(name).ok_or(FsError::InvalidParam)?;
        let mut dir = self.read_inode(dir_idx)?;
        let blocks = self.collect_blocks(&dir)?;
        for block in &blocks {
            let mut fb = self.read_folder(*block)?;
            if fb.add(name_field, child) {
                return self.write_folder(*block, &fb);
            }
        }
        // All blocks full: extend the directory with one more folder block.
        let block = self.map_or_alloc(&mut dir, blocks.len())?;
        let mut fb = FolderBlock::empty();
        fb.add(name_field, child);
        self.write_folder(block, &fb)?;
        self.write_inode(dir_idx, &dir)
    }

    /// Removes the entry `name` from the directory `dir_idx`.
    pub fn remove_entry(&mut self, dir_idx: i32, name: &str) -> Result<(), FsError> {
        let dir = self.read_inode(dir_idx)?;
        for block in self.collect_blocks(&dir)? {
            let mut fb = self.read_folder(block)?;
            if fb.remove(name) {
                return self.write_folder(block, &fb);
            }
        }
        Err(FsError::PathNotFound)
    }

    /// Repoints the entry `name` of the directory `dir_idx` at another
    /// inode (used to fix `..` after a move).
    pub fn relink_entry(&mut self, dir_idx: i32, name: &str, target: i32) -> Result<(), FsError> {
        let dir = self.read_inode(dir_idx)?;
        for block in self.collect_blocks(&dir)? {
            let mut fb = self.read_folder(block)?;
            for entry in fb.entries.iter_mut() {
                if entry.is_used() && entry.name_str() == name {
                    entry.inode = target;
                    return self.write_folder(block, &fb);
                }
            }
        }
        Err(FsError::PathNotFound)
    }

    /// Renames the entry `from` to `to` inside the directory `dir_idx`,
    /// leaving the target inode untouched.
    pub fn rename_entry(&mut self, dir_idx: i32, from: &str, to: &str) -> Result<(), FsError> {
        let name_field = utils::util::pad_name(to).ok_or(FsError::InvalidParam)?;
        let dir = self.read_inode(dir_idx)?;
        for block in self.collect_blocks(&dir)? {
            let mut fb = self.read_folder(block)?;
            for entry in fb.entries.iter_mut() {
                if entry.is_used() && entry.name_str() == from {
                    entry.name = name_field;
                    return self.write_folder(block, &fb);
                }
            }
        }
        Err(FsError::PathNotFound)
    }

    // ---- path traversal ----

    /// Resolves an absolute path to an inode index, starting at the root
    /// inode 0. Returns `None` when a component is missing.
    pub fn resolve(&mut self, path: &str) -> Result<Option<i32>, FsError> {
        let parts = utils::path::split(path).ok_or(FsError::InvalidParam)?;
        let mut cur = 0i32;
        for name in parts {
            let inode = self.read_inode(cur)?;
            if !inode.is_dir() {
                return Ok(None);
            }
            match self.dir_find(&inode, &name)? {
                Some(child) => cur = child,
                None => return Ok(None),
            }
        }
        Ok(Some(cur))
    }

    // ---- file content ----

    /// Reads the whole content of the file inode `idx`.
    pub fn read_file_content(&mut self, idx: i32) -> Result<Vec<u8>, FsError> {
        let inode = self.read_inode(idx)?;
        if !inode.is_file() {
            return Err(FsError::FileNotFound);
        }
        let size = inode.size as usize;
        let bs = self.block_size() as usize;
        let mut out = Vec::with_capacity(size);
        let mut logical = 0usize;
        while out.len() < size {
            let want = (size - out.len()).min(bs);
            match self.map_block(&inode, logical)? {
                Some(block) => {
                    let data = self.read_file_block(block)?;
                    out.extend_from_slice(&data[..want]);
                }
                None => {
                    return Err(FsError::Corrupt(format!(
                        "inodo {} sin bloque para el byte {}",
                        idx,
                        out.len()
                    )))
                }
            }
            logical += 1;
        }
        Ok(out)
    }

    /// Replaces the whole content of the file inode `idx`, reallocating
    /// its blocks.
    pub fn write_file_content(&mut self, idx: i32, data: &[u8], now: i64) -> Result<(), FsError> {
        let mut inode = self.read_inode(idx)?;
        if !inode.is_file() {
            return Err(FsError::FileNotFound);
        }
        self.free_all_blocks(&mut inode)?;
        let bs = self.block_size() as usize;
        for (logical, chunk) in data.chunks(bs).enumerate() {
            let block = self.map_or_alloc(&mut inode, logical)?;
            self.write_file_block(block, chunk)?;
        }
        inode.size = data.len() as i32;
        inode.mtime = now;
        self.write_inode(idx, &inode)
    }

    // ---- journal ----

    fn journal_slot_off(&self, slot: i32) -> i64 {
        self.sb.journal_start + slot as i64 * JOURNAL_ENTRY_SIZE as i64
    }

    /// Appends an entry at the circular write head. Only valid on 3fs.
    pub fn journal_append(&mut self, entry: &JournalEntry) -> Result<(), FsError> {
        if self.kind()? != FsKind::Fs3 {
            return Err(FsError::Unsupported);
        }
        let head = self.sb.journal_head;
        let off = self.abs(self.journal_slot_off(head));
        entry.write_at(&mut self.file, off)?;
        self.sb.journal_head = (head + 1) % self.sb.journal_count;
        self.flush_sb()
    }

    /// All non-empty journal entries, oldest to newest: the scan starts at
    /// the write head and wraps around the fixed buffer.
    pub fn journal_entries(&mut self) -> Result<Vec<JournalEntry>, FsError> {
        if self.kind()? != FsKind::Fs3 {
            return Err(FsError::Unsupported);
        }
        let cap = self.sb.journal_count;
        let mut out = Vec::new();
        for i in 0..cap {
            let slot = (self.sb.journal_head + i) % cap;
            let off = self.abs(self.journal_slot_off(slot));
            let entry = JournalEntry::read_at(&mut self.file, off)?;
            if !entry.is_empty() {
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Zero-fills a region given relative to the partition start.
    pub(crate) fn zero_region(&mut self, rel_off: i64, len: i64) -> Result<(), FsError> {
        let off = self.abs(rel_off);
        io::zero_range(&mut self.file, off, len as u64)?;
        Ok(())
    }

    /// Region sizes used by `loss` and the mkfs replay.
    pub(crate) fn region_sizes(&self) -> (i64, i64, i64, i64) {
        let n = self.sb.inode_count as i64;
        (
            n,
            3 * n,
            n * self.sb.inode_size as i64,
            3 * n * self.block_size(),
        )
    }

    /// Bytes reserved before the first region (superblock and, on 3fs,
    /// the journal).
    pub(crate) fn reserved_prefix(&self) -> i64 {
        SUPERBLOCK_RESERVED + self.sb.journal_count as i64 * JOURNAL_ENTRY_SIZE as i64
    }
}
