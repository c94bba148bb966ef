//! The journaled filesystem variant.
//!
//! Fs3 runs the same core operations as Fs2 but appends a journal entry
//! **before** every mutation; `loss` wipes everything except the
//! superblock and the journal, and `recovery` replays the surviving
//! entries (oldest first) through the journal-free cores, so a replay
//! never re-journals itself.

use crate::journal::JournalEntry;
use crate::superblock::{FsKind, DEFAULT_BLOCK_SIZE_3FS};
use crate::volume::Volume;
use crate::{ops, Credentials, Filesystem, FsError, OpCtx, TreeNode};
use disk::{DiskManager, PartitionRef};
use log::warn;
use utils::perm::Perm;
use utils::util::timestamp;

/// 3fs: caller-chosen block size and a 50-entry circular journal.
pub struct Fs3 {
    block_size: i64,
}

impl Fs3 {
    pub fn new(block_size: i64) -> Self {
        Self { block_size }
    }

    /// Opens the volume and appends the journal entry for an operation,
    /// then hands the volume to the operation itself.
    fn journaled<T, F>(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        op: &str,
        path: &str,
        aux: &str,
        f: F,
    ) -> Result<T, FsError>
    where
        F: FnOnce(&mut Volume) -> Result<T, FsError>,
    {
        let mut vol = Volume::open(dm, part)?;
        let entry = JournalEntry::new(op, path, aux, timestamp(), ctx.creds.uid, ctx.creds.gid);
        vol.journal_append(&entry)?;
        f(&mut vol)
    }
}

impl Default for Fs3 {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE_3FS)
    }
}

fn split_arrow(path: &str) -> Result<(String, String), FsError> {
    path.split_once(" -> ")
        .map(|(a, b)| (a.to_owned(), b.to_owned()))
        .ok_or_else(|| FsError::Corrupt(format!("ruta de journal inválida: {path}")))
}

/// Re-applies one journal entry against the current state. Idempotent:
/// an entry whose effect already holds is a no-op.
fn replay(vol: &mut Volume, e: &JournalEntry) -> Result<(), FsError> {
    let ctx = OpCtx::new(Credentials {
        user: "root".to_owned(),
        group: "root".to_owned(),
        uid: e.uid,
        gid: e.gid,
    });
    let path = e.path_str();
    let aux = e.aux_str();
    match e.op_str().as_str() {
        "mkfs" => ops::reinit(vol),
        "mkdir" => match ops::mkdir(vol, &ctx, &path, true) {
            Err(FsError::AlreadyExists) => Ok(()),
            r => r,
        },
        "mkfile" => ops::mkfile(vol, &ctx, &path, Some(aux.as_bytes()), None),
        "edit" => ops::write_file(vol, &ctx, &path, aux.as_bytes(), false),
        "append" => ops::write_file(vol, &ctx, &path, aux.as_bytes(), true),
        "remove" => match ops::remove(vol, &ctx, &path) {
            Err(FsError::PathNotFound | FsError::NoSuchPath) => Ok(()),
            r => r,
        },
        "rename" => {
            let (from, to) = split_arrow(&path)?;
            match ops::rename(vol, &ctx, &from, &to) {
                Err(FsError::PathNotFound | FsError::NoSuchPath) => Ok(()),
                r => r,
            }
        }
        "copy" => {
            let (from, to) = split_arrow(&path)?;
            match ops::copy(vol, &ctx, &from, &to) {
                Err(FsError::AlreadyExists) => Ok(()),
                r => r,
            }
        }
        "move" => {
            let (from, to) = split_arrow(&path)?;
            match ops::mv(vol, &ctx, &from, &to) {
                Err(FsError::PathNotFound | FsError::NoSuchPath) => Ok(()),
                r => r,
            }
        }
        "chown" => {
            let (user, group) = aux
                .split_once(',')
                .ok_or_else(|| FsError::Corrupt(format!("chown sin usuario,grupo: {aux}")))?;
            ops::chown(vol, &ctx, &path, user, group)
        }
        "chmod" => {
            let perm = Perm::parse(&aux).ok_or(FsError::InvalidParam)?;
            ops::chmod(vol, &ctx, &path, perm)
        }
        "mkgrp" => match ops::add_group(vol, &ctx, &aux) {
            Err(FsError::GroupExists) => Ok(()),
            r => r,
        },
        "rmgrp" => match ops::remove_group(vol, &ctx, &aux) {
            Err(FsError::GroupNotFound) => Ok(()),
            r => r,
        },
        "mkusr" => {
            let mut parts = aux.splitn(3, ',');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(user), Some(pass), Some(group)) => {
                    match ops::add_user(vol, &ctx, user, pass, group) {
                        Err(FsError::UserExists) => Ok(()),
                        r => r,
                    }
                }
                _ => Err(FsError::Corrupt(format!("mkusr truncado en journal: {aux}"))),
            }
        }
        "rmusr" => match ops::remove_user(vol, &ctx, &aux) {
            Err(FsError::UserNotFound) => Ok(()),
            r => r,
        },
        "chgrp" => {
            let (user, group) = aux
                .split_once(',')
                .ok_or_else(|| FsError::Corrupt(format!("chgrp sin usuario,grupo: {aux}")))?;
            ops::change_user_group(vol, &ctx, user, group)
        }
        other => Err(FsError::Corrupt(format!(
            "operación desconocida en journal: {other}"
        ))),
    }
}

impl Filesystem for Fs3 {
    fn kind(&self) -> FsKind {
        FsKind::Fs3
    }

    fn mkfs(&self, dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError> {
        ops::format(dm, part, FsKind::Fs3, self.block_size)
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
        let op = if append { "append" } else { "edit" };
        let aux = String::from_utf8_lossy(content).into_owned();
        self.journaled(dm, part, ctx, op, path, &aux, |vol| {
            ops::write_file(vol, ctx, path, content, append)
        })
    }

    fn mkdir(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        deep: bool,
    ) -> Result<(), FsError> {
        self.journaled(dm, part, ctx, "mkdir", path, "", |vol| {
            ops::mkdir(vol, ctx, path, deep)
        })
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
        // The entry carries a content prefix even for generated content,
        // so a replay restores what fits the 8-byte field.
        let aux = match content {
            Some(c) => String::from_utf8_lossy(c).into_owned(),
            None => "0123456789"
                .chars()
                .cycle()
                .take(size.unwrap_or(0).clamp(0, 8) as usize)
                .collect(),
        };
        self.journaled(dm, part, ctx, "mkfile", path, &aux, |vol| {
            ops::mkfile(vol, ctx, path, content, size)
        })
    }

    fn remove(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
    ) -> Result<(), FsError> {
        self.journaled(dm, part, ctx, "remove", path, "", |vol| {
            ops::remove(vol, ctx, path)
        })
    }

    fn rename(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError> {
        let pair = format!("{} -> {}", from, to);
        self.journaled(dm, part, ctx, "rename", &pair, "", |vol| {
            ops::rename(vol, ctx, from, to)
        })
    }

    fn copy(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError> {
        let pair = format!("{} -> {}", from, to);
        self.journaled(dm, part, ctx, "copy", &pair, "", |vol| {
            ops::copy(vol, ctx, from, to)
        })
    }

    fn mv(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        from: &str,
        to: &str,
    ) -> Result<(), FsError> {
        let pair = format!("{} -> {}", from, to);
        self.journaled(dm, part, ctx, "move", &pair, "", |vol| {
            ops::mv(vol, ctx, from, to)
        })
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
        let aux = format!("{},{}", user, group);
        self.journaled(dm, part, ctx, "chown", path, &aux, |vol| {
            ops::chown(vol, ctx, path, user, group)
        })
    }

    fn chmod(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        path: &str,
        perm: Perm,
    ) -> Result<(), FsError> {
        let aux = perm.to_string();
        self.journaled(dm, part, ctx, "chmod", path, &aux, |vol| {
            ops::chmod(vol, ctx, path, perm)
        })
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
        dm: &DiskManager,
        part: &PartitionRef,
    ) -> Result<Vec<JournalEntry>, FsError> {
        let mut vol = Volume::open(dm, part)?;
        vol.journal_entries()
    }

    fn recovery(&self, dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        let entries = vol.journal_entries()?;
        for entry in entries {
            if let Err(err) = replay(&mut vol, &entry) {
                // An entry that no longer applies is skipped; the rest of
                // the log still replays.
                warn!(
                    "recovery: entrada '{}' {} omitida: {}",
                    entry.op_str(),
                    entry.path_str(),
                    err
                );
            }
        }
        Ok(())
    }

    fn loss(&self, dm: &DiskManager, part: &PartitionRef) -> Result<(), FsError> {
        let mut vol = Volume::open(dm, part)?;
        if vol.kind()? != FsKind::Fs3 {
            return Err(FsError::Unsupported);
        }
        ops::wipe_structures(&mut vol)
    }

    fn add_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        name: &str,
    ) -> Result<(), FsError> {
        self.journaled(dm, part, ctx, "mkgrp", crate::users::USERS_PATH, name, |vol| {
            ops::add_group(vol, ctx, name)
        })
    }

    fn remove_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        name: &str,
    ) -> Result<(), FsError> {
        self.journaled(dm, part, ctx, "rmgrp", crate::users::USERS_PATH, name, |vol| {
            ops::remove_group(vol, ctx, name)
        })
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
        let aux = format!("{},{},{}", user, password, group);
        self.journaled(dm, part, ctx, "mkusr", crate::users::USERS_PATH, &aux, |vol| {
            ops::add_user(vol, ctx, user, password, group)
        })
    }

    fn remove_user(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
    ) -> Result<(), FsError> {
        self.journaled(dm, part, ctx, "rmusr", crate::users::USERS_PATH, user, |vol| {
            ops::remove_user(vol, ctx, user)
        })
    }

    fn change_user_group(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        ctx: &OpCtx,
        user: &str,
        group: &str,
    ) -> Result<(), FsError> {
        let aux = format!("{},{}", user, group);
        self.journaled(dm, part, ctx, "chgrp", crate::users::USERS_PATH, &aux, |vol| {
            ops::change_user_group(vol, ctx, user, group)
        })
    }
}
