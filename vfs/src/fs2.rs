//! The plain (non-journaled) filesystem variant.

use crate::superblock::{FsKind, BLOCK_SIZE_2FS};
use crate::volume::Volume;
use crate::{ops, Filesystem, FsError, JournalEntry, OpCtx, TreeNode};
use disk::{DiskManager, PartitionRef};
use utils::perm::Perm;

/// 2fs: fixed 64-byte blocks, no journal. The journaling operations are
/// rejected.
#[derive(Default)]
pub struct Fs2;

impl Fs2 {
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for Fs2 {
    fn kind(&self) -> FsKind {
        FsKind::Fs2
    }

    fn mkfs(&self, dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError> {
        ops::format(dm, part, FsKind::Fs2, BLOCK_SIZE_2FS)
    }

    fn read_file(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
    ) -> Result<Vec<u8>, FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::read_file(&mut vol, ctx, path)
    }

    fn write_file(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        content: &[u8],
        append: bool,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::write_file(&mut vol, ctx, path, content, append)
    }

    fn mkdir(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        deep: bool,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::mkdir(&mut vol, ctx, path, deep)
    }

    fn mkfile(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        content: Option<&[u8]>,
        size: Option<i64>,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::mkfile(&mut vol, ctx, path, content, size)
    }

    fn remove(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::remove(&mut vol, ctx, path)
    }

    fn rename(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::rename(&mut vol, ctx, from, to)
    }

    fn copy(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::copy(&mut vol, ctx, from, to)
    }

    fn mv(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::mv(&mut vol, ctx, from, to)
    }

    fn find(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        base: &str,
        pattern: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::find(&mut vol, ctx, base, pattern, limit)
    }

    fn chown(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        user: &str,
        group: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::chown(&mut vol, ctx, path, user, group)
    }

    fn chmod(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        perm: Perm,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::chmod(&mut vol, ctx, path, perm)
    }

    fn tree(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
    ) -> Result<TreeNode, FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::tree(&mut vol, ctx, path)
    }

    fn journaling(
        &self,
        _dm: &DiskManager,
        _part: &PartitionRef,
    ) -> Result<Vec<JournalEntry>, FsError> {
        Err(FsError::Unsupported)
    }

    fn recovery(&self, _dm: &DiskManager, _part: &PartitionRef) -> Result<(), FsError> {
        Err(FsError::Unsupported)
    }

    fn loss(&self, _dm: &DiskManager, _part: &PartitionRef) -> Result<(), FsError> {
        Err(FsError::Unsupported)
    }

    fn add_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        name: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::add_group(&mut vol, ctx, name)
    }

    fn remove_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        name: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::remove_group(&mut vol, ctx, name)
    }

    fn add_user(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
        password: &str,
        group: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::add_user(&mut vol, ctx, user, password, group)
    }

    fn remove_user(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::remove_user(&mut vol, ctx, user)
    }

    fn change_user_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
        group: &str,
    ) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        ops::change_user_group(&mut vol, ctx, user, group)
    }
}
