//! Directory and pointer blocks.
//!
//! A folder block is a fixed table of 4 entries; a pointer block holds 16
//! block indices. Both occupy 64 bytes regardless of the partition's block
//! size; file blocks are raw `block_size` bytes and are handled by the
//! volume directly.

use utils::io;
use utils::io::Record;
use utils::util::trim_name;

/// Entries per folder block.
pub const FOLDER_ENTRIES: usize = 4;

/// Length of a directory entry name.
pub const ENTRY_NAME_LEN: usize = 12;

/// Pointers per pointer block.
pub const BLOCK_POINTERS: usize = 16;

/// One entry of a folder block; `inode == -1` marks a free slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; ENTRY_NAME_LEN],
    pub inode: i32,
}

impl DirEntry {
    pub fn free() -> Self {
        Self {
            name: [0; ENTRY_NAME_LEN],
            inode: -1,
        }
    }

    pub fn is_used(&self) -> bool {
        self.inode != -1
    }

    pub fn name_str(&self) -> String {
        trim_name(&self.name)
    }
}

/// A directory block: 4 fixed entries of `{name[12], inode}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FolderBlock {
    pub entries: [DirEntry; FOLDER_ENTRIES],
}

impl FolderBlock {
    pub fn empty() -> Self {
        Self {
            entries: [DirEntry::free(); FOLDER_ENTRIES],
        }
    }

    /// Adds an entry in the first free slot. Returns `false` when the
    /// block is full.
    pub fn add(&mut self, name: [u8; ENTRY_NAME_LEN], inode: i32) -> bool {
        for entry in self.entries.iter_mut() {
            if !entry.is_used() {
                *entry = DirEntry { name, inode };
                return true;
            }
        }
        false
    }

    /// Looks an entry up by name.
    pub fn find(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|e| e.is_used() && e.name_str() == name)
            .map(|e| e.inode)
    }

    /// Clears the entry carrying `name`. Returns `false` when absent.
    pub fn remove(&mut self, name: &str) -> bool {
        for entry in self.entries.iter_mut() {
            if entry.is_used() && entry.name_str() == name {
                *entry = DirEntry::free();
                return true;
            }
        }
        false
    }

    pub fn used(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|e| e.is_used())
    }
}

impl Record for FolderBlock {
    const SIZE: usize = 64;

    fn decode(buf: &[u8]) -> Self {
        let mut block = Self::empty();
        for (i, entry) in block.entries.iter_mut().enumerate() {
            let off = i * 16;
            entry.name.copy_from_slice(&buf[off..off + ENTRY_NAME_LEN]);
            entry.inode = io::get_i32(buf, off + ENTRY_NAME_LEN);
        }
        block
    }

    fn encode(&self, buf: &mut [u8]) {
        for (i, entry) in self.entries.iter().enumerate() {
            let off = i * 16;
            buf[off..off + ENTRY_NAME_LEN].copy_from_slice(&entry.name);
            io::put_i32(buf, off + ENTRY_NAME_LEN, entry.inode);
        }
    }
}

/// An indirection block: 16 block indices, `-1` meaning unused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerBlock {
    pub ptrs: [i32; BLOCK_POINTERS],
}

impl PointerBlock {
    pub fn empty() -> Self {
        Self {
            ptrs: [-1; BLOCK_POINTERS],
        }
    }
}

impl Record for PointerBlock {
    const SIZE: usize = 64;

    fn decode(buf: &[u8]) -> Self {
        let mut block = Self::empty();
        for (i, ptr) in block.ptrs.iter_mut().enumerate() {
            *ptr = io::get_i32(buf, i * 4);
        }
        block
    }

    fn encode(&self, buf: &mut [u8]) {
        for (i, ptr) in self.ptrs.iter().enumerate() {
            io::put_i32(buf, i * 4, *ptr);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use utils::util::pad_name;

    #[test]
    fn folder_block_entries() {
        let mut block = FolderBlock::empty();
        assert!(block.add(pad_name(".").unwrap(), 0));
        assert!(block.add(pad_name("..").unwrap(), 0));
        assert!(block.add(pad_name("users.txt").unwrap(), 1));
        assert_eq!(block.find("users.txt"), Some(1));
        assert_eq!(block.find("nope"), None);
        assert!(block.add(pad_name("d").unwrap(), 5));
        assert!(!block.add(pad_name("full").unwrap(), 6));
        assert!(block.remove("d"));
        assert!(!block.remove("d"));
        assert_eq!(block.used().count(), 3);
    }

    #[test]
    fn folder_block_roundtrip() {
        let mut block = FolderBlock::empty();
        block.add(pad_name("a").unwrap(), 3);
        let mut buf = [0u8; FolderBlock::SIZE];
        block.encode(&mut buf);
        assert_eq!(FolderBlock::decode(&buf), block);
    }

    #[test]
    fn pointer_block_roundtrip() {
        let mut block = PointerBlock::empty();
        block.ptrs[0] = 9;
        block.ptrs[15] = 44_000;
        let mut buf = [0u8; PointerBlock::SIZE];
        block.encode(&mut buf);
        assert_eq!(PointerBlock::decode(&buf), block);
    }
}
