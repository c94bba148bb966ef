//! The on-disk inode.

use utils::io;
use utils::io::Record;
use utils::perm::Perm;

/// Number of direct block pointers.
pub const DIRECT_POINTERS: usize = 12;

/// Total block pointers: 12 direct, then single, double and triple
/// indirect.
pub const INODE_POINTERS: usize = 15;

/// Slot index of the single indirect pointer.
pub const SINGLE_INDIRECT: usize = 12;
/// Slot index of the double indirect pointer.
pub const DOUBLE_INDIRECT: usize = 13;
/// Slot index of the triple indirect pointer.
pub const TRIPLE_INDIRECT: usize = 14;

/// Inode type tag: directory.
pub const TYPE_DIR: u8 = 0;
/// Inode type tag: file.
pub const TYPE_FILE: u8 = 1;

/// A 128-byte inode. Block pointers hold block indices, `-1` meaning
/// unused. Permissions are three ASCII octal digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inode {
    pub uid: i32,
    pub gid: i32,
    /// Content size in bytes (0 for directories).
    pub size: i32,
    pub atime: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub i_block: [i32; INODE_POINTERS],
    /// 0 directory, 1 file.
    pub itype: u8,
    pub perm: [u8; 3],
}

impl Inode {
    pub fn new(uid: i32, gid: i32, itype: u8, perm: Perm, now: i64) -> Self {
        Self {
            uid,
            gid,
            size: 0,
            atime: now,
            ctime: now,
            mtime: now,
            i_block: [-1; INODE_POINTERS],
            itype,
            perm: perm.digits(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.itype == TYPE_DIR
    }

    pub fn is_file(&self) -> bool {
        self.itype == TYPE_FILE
    }

    /// The permission triple, rejecting corrupt digits.
    pub fn perm(&self) -> Option<Perm> {
        Perm::from_digits(self.perm)
    }
}

impl Record for Inode {
    const SIZE: usize = 128;

    fn decode(buf: &[u8]) -> Self {
        let mut i_block = [-1i32; INODE_POINTERS];
        for (i, slot) in i_block.iter_mut().enumerate() {
            *slot = io::get_i32(buf, 36 + i * 4);
        }
        let mut perm = [0u8; 3];
        perm.copy_from_slice(&buf[97..100]);
        Self {
            uid: io::get_i32(buf, 0),
            gid: io::get_i32(buf, 4),
            size: io::get_i32(buf, 8),
            atime: io::get_i64(buf, 12),
            ctime: io::get_i64(buf, 20),
            mtime: io::get_i64(buf, 28),
            i_block,
            itype: buf[96],
            perm,
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        io::put_i32(buf, 0, self.uid);
        io::put_i32(buf, 4, self.gid);
        io::put_i32(buf, 8, self.size);
        io::put_i64(buf, 12, self.atime);
        io::put_i64(buf, 20, self.ctime);
        io::put_i64(buf, 28, self.mtime);
        for (i, slot) in self.i_block.iter().enumerate() {
            io::put_i32(buf, 36 + i * 4, *slot);
        }
        buf[96] = self.itype;
        buf[97..100].copy_from_slice(&self.perm);
    }
}
