//! The filesystems of the virtual disk: a UNIX-style indexed filesystem
//! (2fs) and its journaled variant (3fs).
//!
//! Both variants share the layout engine, the inode/block allocators and
//! the users-file logic; 3fs additionally wraps every mutation in a
//! journal append, which makes `loss`/`recovery` possible.

pub mod block;
mod error;
pub mod fs2;
pub mod fs3;
pub mod inode;
pub mod journal;
pub mod ops;
pub mod superblock;
pub mod users;
pub mod volume;

pub use error::FsError;
pub use fs2::Fs2;
pub use fs3::Fs3;
pub use journal::JournalEntry;
pub use superblock::{FsKind, Superblock, BLOCK_SIZE_2FS, DEFAULT_BLOCK_SIZE_3FS};
pub use volume::Volume;

use disk::{DiskManager, PartitionRef};
use std::time::Instant;
use utils::perm::Perm;
use utils::util::timestamp;

/// Identity an operation runs under, resolved at `login` time from
/// `/users.txt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub group: String,
    pub uid: i32,
    pub gid: i32,
}

impl Credentials {
    pub fn root() -> Self {
        Self {
            user: "root".to_owned(),
            group: "root".to_owned(),
            uid: ops::ROOT_UID,
            gid: ops::ROOT_GID,
        }
    }

    pub fn is_root(&self) -> bool {
        self.user == "root"
    }
}

/// Per-request context: the caller's credentials and an optional
/// deadline, honoured at natural checkpoints of the longer walks.
#[derive(Clone, Debug)]
pub struct OpCtx {
    pub creds: Credentials,
    pub deadline: Option<Instant>,
}

impl OpCtx {
    pub fn new(creds: Credentials) -> Self {
        Self {
            creds,
            deadline: None,
        }
    }

    pub fn root() -> Self {
        Self::new(Credentials::root())
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fails with `Cancelled` once the deadline has passed. Partial
    /// writes are not rolled back; journal recovery is the compensation
    /// path.
    pub fn checkpoint(&self) -> Result<(), FsError> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => Err(FsError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// One node of the directory tree (report collaborator shape).
#[derive(Clone, Debug)]
pub struct TreeNode {
    pub name: String,
    pub inode: i32,
    pub is_dir: bool,
    pub perm: String,
    pub uid: i32,
    pub gid: i32,
    pub size: i32,
    pub children: Vec<TreeNode>,
}

/// The capability set both filesystem variants expose. The dispatcher
/// picks the variant by the fs kind recorded at `mkfs` time.
pub trait Filesystem {
    fn kind(&self) -> FsKind;

    fn mkfs(&self, dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError>;

    fn read_file(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
    ) -> Result<Vec<u8>, FsError>;

    fn write_file(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        content: &[u8],
        append: bool,
    ) -> Result<(), FsError>;

    fn mkdir(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        deep: bool,
    ) -> Result<(), FsError>;

    fn mkfile(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        content: Option<&[u8]>,
        size: Option<i64>,
    ) -> Result<(), FsError>;

    fn remove(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
    ) -> Result<(), FsError>;

    fn rename(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError>;

    fn copy(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError>;

    fn mv(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError>;

    fn find(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        base: &str,
        pattern: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, FsError>;

    fn chown(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        user: &str,
        group: &str,
    ) -> Result<(), FsError>;

    fn chmod(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        perm: Perm,
    ) -> Result<(), FsError>;

    fn tree(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
    ) -> Result<TreeNode, FsError>;

    fn journaling(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
    ) -> Result<Vec<JournalEntry>, FsError>;

    fn recovery(&self, dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError>;

    fn loss(&self, dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError>;

    fn add_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        name: &str,
    ) -> Result<(), FsError>;

    fn remove_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        name: &str,
    ) -> Result<(), FsError>;

    fn add_user(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
        password: &str,
        group: &str,
    ) -> Result<(), FsError>;

    fn remove_user(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
    ) -> Result<(), FsError>;

    fn change_user_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
        group: &str,
    ) -> Result<(), FsError>;
}

/// Reads the fs kind recorded in a formatted partition's superblock.
pub fn probe_kind(dm: &DiskManager, part: &PartitionRef) -> Result<FsKind, FsError> {
    Volume::open(dm, part)?.kind()
}

/// Validates a user/password pair against the partition's `/users.txt`.
pub fn authenticate(
    dm: &DiskManager,
    part: &PartitionRef,
    user: &str,
    password: &str,
) -> Result<Credentials, FsError> {
    let mut vol = Volume::open(dm, part)?;
    ops::authenticate(&mut vol, user, password)
}

/// Stamps a mount on the superblock: bumps the mount count and records
/// the mount time.
pub fn stamp_mount(dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError> {
    let mut vol = Volume::open(dm, part)?;
    vol.sb.mounted_at = timestamp();
    vol.sb.mount_count += 1;
    vol.flush_sb()
}
