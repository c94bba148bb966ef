//! Core filesystem operations.
//!
//! Both variants run these against an opened [`Volume`]; 3fs wraps each
//! mutation with a journal append before calling in here, which is also
//! what lets `recovery` replay entries without re-journaling them.

use crate::block::FolderBlock;
use crate::inode::{Inode, TYPE_DIR, TYPE_FILE};
use crate::journal::JournalEntry;
use crate::superblock::{FsKind, Superblock, SUPERBLOCK_RESERVED};
use crate::users::{UsersTable, INITIAL_USERS, USERS_PATH};
use crate::volume::Volume;
use crate::{Credentials, FsError, OpCtx, TreeNode};
use disk::{DiskManager, PartitionRef};
use log::info;
use utils::path;
use utils::perm::{Access, Perm};
use utils::util::{pad_name, timestamp};

/// uid/gid of root in the users table.
pub const ROOT_UID: i32 = 1;
pub const ROOT_GID: i32 = 1;

fn can_access(creds: &Credentials, inode: &Inode, access: Access) -> bool {
    if creds.is_root() {
        return true;
    }
    let perm = match inode.perm() {
        Some(p) => p,
        None => return false,
    };
    let class = if creds.uid == inode.uid {
        perm.owner()
    } else if creds.gid == inode.gid {
        perm.group()
    } else {
        perm.other()
    };
    class.contains(access)
}

fn require(ctx: &OpCtx, inode: &Inode, access: Access, what: &str) -> Result<(), FsError> {
    if can_access(&ctx.creds, inode, access) {
        Ok(())
    } else {
        Err(FsError::Unauthorized(what.to_owned()))
    }
}

fn entry_name(name: &str) -> Result<[u8; crate::block::ENTRY_NAME_LEN], FsError> {
    pad_name(name).ok_or(FsError::InvalidParam)
}

fn lookup(vol: &mut Volume, path: &str) -> Result<i32, FsError> {
    vol.resolve(path)?.ok_or(FsError::NoSuchPath)
}

fn lookup_components(vol: &mut Volume, parts: &[String]) -> Result<Option<i32>, FsError> {
    let mut cur = 0i32;
    for name in parts {
        let inode = vol.read_inode(cur)?;
        if !inode.is_dir() {
            return Ok(None);
        }
        match vol.dir_find(&inode, name)? {
            Some(child) => cur = child,
            None => return Ok(None),
        }
    }
    Ok(Some(cur))
}

// ---- mkfs ----

/// Formats the partition: writes the superblock, zeroes the metadata
/// regions (journal included on 3fs) and creates the root directory and
/// the initial `/users.txt`.
pub fn format(
    dm: &DiskManager,
    part: &PartitionRef,
    kind: FsKind,
    block_size: i64,
) -> Result<(), FsError> {
    let span = dm.locate(&part.disk_path, &part.name)?;
    let file = utils::io::open_rw(&part.disk_path)?;
    let now = timestamp();
    let sb = Superblock::build(kind, span.size, block_size, now)?;
    let metadata_len = sb.block_start - SUPERBLOCK_RESERVED;
    let mut vol = Volume::from_parts(file, span.start, span.size, sb);

    vol.zero_region(SUPERBLOCK_RESERVED, metadata_len)?;
    vol.flush_sb()?;
    if kind == FsKind::Fs3 {
        // The format itself is the first journaled operation.
        vol.journal_append(&JournalEntry::new("mkfs", "/", "", now, ROOT_UID, ROOT_GID))?;
    }
    init_structures(&mut vol, now)?;
    info!(
        "mkfs {} '{}': {} con {} inodos, {} bloques",
        part.disk_path.display(),
        part.name,
        kind,
        vol.sb.inode_count,
        vol.sb.block_count
    );
    Ok(())
}

/// Creates inode 0 (root directory), folder block 0 and the initial users
/// file in inode/block 1. Expects freshly zeroed bitmaps.
pub(crate) fn init_structures(vol: &mut Volume, now: i64) -> Result<(), FsError> {
    let root_idx = vol.alloc_inode()?;
    let root_block = vol.alloc_block()?;
    let users_idx = vol.alloc_inode()?;
    let users_block = vol.alloc_block()?;

    let mut root = Inode::new(ROOT_UID, ROOT_GID, TYPE_DIR, Perm::DIR_DEFAULT, now);
    root.i_block[0] = root_block;
    vol.write_inode(root_idx, &root)?;

    let mut fb = FolderBlock::empty();
    fb.add(entry_name(".")?, root_idx);
    fb.add(entry_name("..")?, root_idx);
    fb.add(entry_name("users.txt")?, users_idx);
    vol.write_folder(root_block, &fb)?;

    let mut users = Inode::new(ROOT_UID, ROOT_GID, TYPE_FILE, Perm::FILE_DEFAULT, now);
    users.i_block[0] = users_block;
    users.size = INITIAL_USERS.len() as i32;
    vol.write_inode(users_idx, &users)?;
    vol.write_file_block(users_block, INITIAL_USERS.as_bytes())?;
    Ok(())
}

// ---- directories and files ----

fn create_dir(vol: &mut Volume, ctx: &OpCtx, parent: i32, name: &str) -> Result<i32, FsError> {
    let now = timestamp();
    let idx = vol.alloc_inode()?;
    let block = vol.alloc_block()?;
    let mut inode = Inode::new(ctx.creds.uid, ctx.creds.gid, TYPE_DIR, Perm::DIR_DEFAULT, now);
    inode.i_block[0] = block;
    vol.write_inode(idx, &inode)?;

    let mut fb = FolderBlock::empty();
    fb.add(entry_name(".")?, idx);
    fb.add(entry_name("..")?, parent);
    vol.write_folder(block, &fb)?;

    vol.add_entry(parent, name, idx)?;
    Ok(idx)
}

/// `mkdir`. With `deep`, missing intermediate directories are created;
/// without it a missing parent fails.
pub fn mkdir(vol: &mut Volume, ctx: &OpCtx, path: &str, deep: bool) -> Result<(), FsError> {
    let parts = path::split(path).ok_or(FsError::InvalidParam)?;
    if parts.is_empty() {
        return Err(FsError::AlreadyExists);
    }
    let mut cur = 0i32;
    for (i, name) in parts.iter().enumerate() {
        ctx.checkpoint()?;
        let last = i + 1 == parts.len();
        let inode = vol.read_inode(cur)?;
        if !inode.is_dir() {
            return Err(FsError::DirNotFound);
        }
        match vol.dir_find(&inode, name)? {
            Some(child) => {
                if last {
                    return Err(FsError::AlreadyExists);
                }
                cur = child;
            }
            None => {
                if !last && !deep {
                    return Err(FsError::NoParentFolders);
                }
                require(ctx, &inode, Access::WRITE, "crear en el directorio")?;
                cur = create_dir(vol, ctx, cur, name)?;
            }
        }
    }
    Ok(())
}

fn generated_content(size: i64) -> Vec<u8> {
    (0..size).map(|i| b'0' + (i % 10) as u8).collect()
}

/// `mkfile`. Creates or replaces a file; with no explicit content, `size`
/// bytes of cycling ASCII digits are generated.
pub fn mkfile(
    vol: &mut Volume,
    ctx: &OpCtx,
    path: &str,
    content: Option<&[u8]>,
    size: Option<i64>,
) -> Result<(), FsError> {
    let (parents, name) = path::split_parent(path).ok_or(FsError::InvalidParam)?;
    let parent_idx = lookup_components(vol, &parents)?.ok_or(FsError::NoParentFolders)?;
    let parent = vol.read_inode(parent_idx)?;
    if !parent.is_dir() {
        return Err(FsError::DirNotFound);
    }

    let data = match content {
        Some(c) => c.to_vec(),
        None => {
            let n = size.unwrap_or(0);
            if n < 0 {
                return Err(FsError::InvalidParam);
            }
            generated_content(n)
        }
    };
    let now = timestamp();

    match vol.dir_find(&parent, &name)? {
        Some(existing) => {
            let node = vol.read_inode(existing)?;
            if !node.is_file() {
                return Err(FsError::AlreadyExists);
            }
            require(ctx, &node, Access::WRITE, "sobrescribir el archivo")?;
            vol.write_file_content(existing, &data, now)
        }
        None => {
            require(ctx, &parent, Access::WRITE, "crear en el directorio")?;
            let idx = vol.alloc_inode()?;
            let inode = Inode::new(ctx.creds.uid, ctx.creds.gid, TYPE_FILE, Perm::FILE_DEFAULT, now);
            vol.write_inode(idx, &inode)?;
            vol.add_entry(parent_idx, &name, idx)?;
            vol.write_file_content(idx, &data, now)
        }
    }
}

/// `cat`: reads a file, checking read permission.
pub fn read_file(vol: &mut Volume, ctx: &OpCtx, path: &str) -> Result<Vec<u8>, FsError> {
    let idx = vol.resolve(path)?.ok_or(FsError::FileNotFound)?;
    let inode = vol.read_inode(idx)?;
    if !inode.is_file() {
        return Err(FsError::FileNotFound);
    }
    require(ctx, &inode, Access::READ, "leer el archivo")?;
    vol.read_file_content(idx)
}

/// `edit`: rewrites from offset 0 (truncating) or appends after the
/// current size.
pub fn write_file(
    vol: &mut Volume,
    ctx: &OpCtx,
    path: &str,
    content: &[u8],
    append: bool,
) -> Result<(), FsError> {
    let idx = vol.resolve(path)?.ok_or(FsError::FileNotFound)?;
    let inode = vol.read_inode(idx)?;
    if !inode.is_file() {
        return Err(FsError::FileNotFound);
    }
    require(ctx, &inode, Access::WRITE, "editar el archivo")?;
    let data = if append {
        let mut d = vol.read_file_content(idx)?;
        d.extend_from_slice(content);
        d
    } else {
        content.to_vec()
    };
    vol.write_file_content(idx, &data, timestamp())
}

fn collect_subtree(
    vol: &mut Volume,
    ctx: &OpCtx,
    idx: i32,
    out: &mut Vec<i32>,
) -> Result<(), FsError> {
    ctx.checkpoint()?;
    let inode = vol.read_inode(idx)?;
    require(ctx, &inode, Access::WRITE, "eliminar")?;
    if inode.is_dir() {
        for (name, child) in vol.dir_entries(idx)? {
            if name == "." || name == ".." {
                continue;
            }
            collect_subtree(vol, ctx, child, out)?;
        }
    }
    out.push(idx);
    Ok(())
}

/// `remove`. Refuses `/`. Directory removal is all-or-nothing: the whole
/// subtree is permission-checked before anything is freed.
pub fn remove(vol: &mut Volume, ctx: &OpCtx, path: &str) -> Result<(), FsError> {
    let cleaned = path::clean(path).ok_or(FsError::InvalidParam)?;
    if cleaned == "/" {
        return Err(FsError::InvalidParam);
    }
    let (parents, name) = path::split_parent(&cleaned).ok_or(FsError::InvalidParam)?;
    let parent_idx = lookup_components(vol, &parents)?.ok_or(FsError::NoSuchPath)?;
    let parent = vol.read_inode(parent_idx)?;
    let idx = vol.dir_find(&parent, &name)?.ok_or(FsError::PathNotFound)?;

    let mut doomed = Vec::new();
    collect_subtree(vol, ctx, idx, &mut doomed)?;

    for node in doomed {
        let mut inode = vol.read_inode(node)?;
        vol.free_all_blocks(&mut inode)?;
        vol.write_inode(node, &inode)?;
        vol.free_inode(node)?;
    }
    vol.remove_entry(parent_idx, &name)
}

/// `rename`: changes the entry's name inside its parent; both paths must
/// share the parent.
pub fn rename(vol: &mut Volume, ctx: &OpCtx, from: &str, to: &str) -> Result<(), FsError> {
    let (from_parents, from_name) = path::split_parent(from).ok_or(FsError::InvalidParam)?;
    let (to_parents, to_name) = path::split_parent(to).ok_or(FsError::InvalidParam)?;
    if from_parents != to_parents {
        return Err(FsError::InvalidParam);
    }
    let parent_idx = lookup_components(vol, &from_parents)?.ok_or(FsError::NoSuchPath)?;
    let parent = vol.read_inode(parent_idx)?;
    require(ctx, &parent, Access::WRITE, "renombrar")?;
    vol.dir_find(&parent, &from_name)?.ok_or(FsError::PathNotFound)?;
    if vol.dir_find(&parent, &to_name)?.is_some() {
        return Err(FsError::AlreadyExists);
    }
    vol.rename_entry(parent_idx, &from_name, &to_name)
}

fn copy_node(
    vol: &mut Volume,
    ctx: &OpCtx,
    src_idx: i32,
    dst_parent: i32,
    name: &str,
) -> Result<i32, FsError> {
    ctx.checkpoint()?;
    let src = vol.read_inode(src_idx)?;
    require(ctx, &src, Access::READ, "copiar")?;
    let now = timestamp();
    if src.is_file() {
        let data = vol.read_file_content(src_idx)?;
        let idx = vol.alloc_inode()?;
        let mut inode = Inode::new(ctx.creds.uid, ctx.creds.gid, TYPE_FILE, Perm::FILE_DEFAULT, now);
        inode.perm = src.perm;
        vol.write_inode(idx, &inode)?;
        vol.add_entry(dst_parent, name, idx)?;
        vol.write_file_content(idx, &data, now)?;
        Ok(idx)
    } else {
        let idx = create_dir(vol, ctx, dst_parent, name)?;
        let mut inode = vol.read_inode(idx)?;
        inode.perm = src.perm;
        vol.write_inode(idx, &inode)?;
        for (ename, child) in vol.dir_entries(src_idx)? {
            if ename == "." || ename == ".." {
                continue;
            }
            copy_node(vol, ctx, child, idx, &ename)?;
        }
        Ok(idx)
    }
}

/// `copy`: duplicates a file or a whole directory tree with fresh inodes.
pub fn copy(vol: &mut Volume, ctx: &OpCtx, from: &str, to: &str) -> Result<(), FsError> {
    let src_idx = lookup(vol, from)?;
    let (to_parents, to_name) = path::split_parent(to).ok_or(FsError::InvalidParam)?;
    let dst_parent = lookup_components(vol, &to_parents)?.ok_or(FsError::NoParentFolders)?;
    let dparent = vol.read_inode(dst_parent)?;
    if !dparent.is_dir() {
        return Err(FsError::DirNotFound);
    }
    require(ctx, &dparent, Access::WRITE, "copiar al directorio")?;
    if vol.dir_find(&dparent, &to_name)?.is_some() {
        return Err(FsError::AlreadyExists);
    }
    copy_node(vol, ctx, src_idx, dst_parent, &to_name)?;
    Ok(())
}

fn parent_of(vol: &mut Volume, idx: i32) -> Result<i32, FsError> {
    for (name, child) in vol.dir_entries(idx)? {
        if name == ".." {
            return Ok(child);
        }
    }
    Err(FsError::Corrupt(format!("directorio {} sin entrada ..", idx)))
}

/// `move`: splices the entry from the old parent to the new one. No data
/// blocks are touched.
pub fn mv(vol: &mut Volume, ctx: &OpCtx, from: &str, to: &str) -> Result<(), FsError> {
    let cleaned = path::clean(from).ok_or(FsError::InvalidParam)?;
    if cleaned == "/" {
        return Err(FsError::InvalidParam);
    }
    let (from_parents, from_name) = path::split_parent(&cleaned).ok_or(FsError::InvalidParam)?;
    let src_parent = lookup_components(vol, &from_parents)?.ok_or(FsError::NoSuchPath)?;
    let sparent = vol.read_inode(src_parent)?;
    let src_idx = vol.dir_find(&sparent, &from_name)?.ok_or(FsError::PathNotFound)?;

    let (to_parents, to_name) = path::split_parent(to).ok_or(FsError::InvalidParam)?;
    let dst_parent = lookup_components(vol, &to_parents)?.ok_or(FsError::NoParentFolders)?;
    let dparent = vol.read_inode(dst_parent)?;
    if !dparent.is_dir() {
        return Err(FsError::DirNotFound);
    }
    require(ctx, &sparent, Access::WRITE, "mover")?;
    require(ctx, &dparent, Access::WRITE, "mover al directorio")?;
    if vol.dir_find(&dparent, &to_name)?.is_some() {
        return Err(FsError::AlreadyExists);
    }

    // A directory cannot be moved under itself.
    let mut cur = dst_parent;
    loop {
        if cur == src_idx {
            return Err(FsError::InvalidParam);
        }
        if cur == 0 {
            break;
        }
        cur = parent_of(vol, cur)?;
    }

    vol.remove_entry(src_parent, &from_name)?;
    vol.add_entry(dst_parent, &to_name, src_idx)?;
    let node = vol.read_inode(src_idx)?;
    if node.is_dir() {
        vol.relink_entry(src_idx, "..", dst_parent)?;
    }
    Ok(())
}

/// Glob matching with `*` and `?` only.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    fn matches(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => matches(&p[1..], n) || (!n.is_empty() && matches(p, &n[1..])),
            (Some(b'?'), Some(_)) => matches(&p[1..], &n[1..]),
            (Some(c), Some(d)) if c == d => matches(&p[1..], &n[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), name.as_bytes())
}

fn walk_find(
    vol: &mut Volume,
    ctx: &OpCtx,
    idx: i32,
    prefix: &str,
    pattern: Option<&str>,
    limit: usize,
    out: &mut Vec<String>,
) -> Result<(), FsError> {
    ctx.checkpoint()?;
    for (name, child) in vol.dir_entries(idx)? {
        if out.len() >= limit {
            return Ok(());
        }
        if name == "." || name == ".." {
            continue;
        }
        let child_path = if prefix == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", prefix, name)
        };
        if pattern.map_or(true, |p| glob_match(p, &name)) {
            out.push(child_path.clone());
        }
        let node = vol.read_inode(child)?;
        if node.is_dir() {
            walk_find(vol, ctx, child, &child_path, pattern, limit, out)?;
        }
    }
    Ok(())
}

/// `find`: DFS from `base`, matching entry names against the glob
/// pattern. A missing pattern matches everything.
pub fn find(
    vol: &mut Volume,
    ctx: &OpCtx,
    base: &str,
    pattern: Option<&str>,
    limit: usize,
) -> Result<Vec<String>, FsError> {
    let base = path::clean(base).ok_or(FsError::InvalidParam)?;
    let base_idx = lookup(vol, &base)?;
    let node = vol.read_inode(base_idx)?;
    if !node.is_dir() {
        return Err(FsError::DirNotFound);
    }
    let mut out = Vec::new();
    walk_find(vol, ctx, base_idx, &base, pattern, limit, &mut out)?;
    Ok(out)
}

/// `chown`: re-owns the target to an existing user and group. Only root
/// or the current owner may do it.
pub fn chown(
    vol: &mut Volume,
    ctx: &OpCtx,
    path: &str,
    user: &str,
    group: &str,
) -> Result<(), FsError> {
    let idx = lookup(vol, path)?;
    let mut inode = vol.read_inode(idx)?;
    if !ctx.creds.is_root() && ctx.creds.uid != inode.uid {
        return Err(FsError::Unauthorized("chown".to_owned()));
    }
    let (_, table) = read_users_table(vol)?;
    let (uid, _, _, _) = table.find_user(user).ok_or(FsError::UserNotFound)?;
    let gid = table.find_group(group).ok_or(FsError::GroupNotFound)?;
    inode.uid = uid;
    inode.gid = gid;
    inode.ctime = timestamp();
    vol.write_inode(idx, &inode)
}

/// `chmod`: rewrites the permission triple. Only root or the owner.
pub fn chmod(vol: &mut Volume, ctx: &OpCtx, path: &str, perm: Perm) -> Result<(), FsError> {
    let idx = lookup(vol, path)?;
    let mut inode = vol.read_inode(idx)?;
    if !ctx.creds.is_root() && ctx.creds.uid != inode.uid {
        return Err(FsError::Unauthorized("chmod".to_owned()));
    }
    inode.perm = perm.digits();
    inode.ctime = timestamp();
    vol.write_inode(idx, &inode)
}

fn build_tree(vol: &mut Volume, ctx: &OpCtx, idx: i32, name: &str) -> Result<TreeNode, FsError> {
    ctx.checkpoint()?;
    let inode = vol.read_inode(idx)?;
    let mut node = TreeNode {
        name: name.to_owned(),
        inode: idx,
        is_dir: inode.is_dir(),
        perm: String::from_utf8_lossy(&inode.perm).into_owned(),
        uid: inode.uid,
        gid: inode.gid,
        size: inode.size,
        children: Vec::new(),
    };
    if inode.is_dir() {
        for (ename, child) in vol.dir_entries(idx)? {
            if ename == "." || ename == ".." {
                continue;
            }
            node.children.push(build_tree(vol, ctx, child, &ename)?);
        }
    }
    Ok(node)
}

/// Builds the tree rooted at `path` (used by the report collaborator).
pub fn tree(vol: &mut Volume, ctx: &OpCtx, path: &str) -> Result<TreeNode, FsError> {
    let cleaned = path::clean(path).ok_or(FsError::InvalidParam)?;
    let idx = lookup(vol, &cleaned)?;
    let name = if cleaned == "/" {
        "/".to_owned()
    } else {
        path::split_parent(&cleaned)
            .map(|(_, n)| n)
            .unwrap_or_else(|| "/".to_owned())
    };
    build_tree(vol, ctx, idx, &name)
}

// ---- users table ----

fn read_users_table(vol: &mut Volume) -> Result<(i32, UsersTable), FsError> {
    let idx = vol.resolve(USERS_PATH)?.ok_or(FsError::FileNotFound)?;
    let content = vol.read_file_content(idx)?;
    let table = UsersTable::parse(&String::from_utf8_lossy(&content))?;
    Ok((idx, table))
}

fn require_root(ctx: &OpCtx) -> Result<(), FsError> {
    if ctx.creds.is_root() {
        Ok(())
    } else {
        Err(FsError::Unauthorized(
            "solo root administra usuarios y grupos".to_owned(),
        ))
    }
}

/// Validates a user/password pair against `/users.txt`.
pub fn authenticate(vol: &mut Volume, user: &str, password: &str) -> Result<Credentials, FsError> {
    let (_, table) = read_users_table(vol)?;
    table.login(user, password)
}

fn mutate_users<F>(vol: &mut Volume, ctx: &OpCtx, f: F) -> Result<(), FsError>
where
    F: FnOnce(&mut UsersTable) -> Result<(), FsError>,
{
    require_root(ctx)?;
    let (idx, mut table) = read_users_table(vol)?;
    f(&mut table)?;
    vol.write_file_content(idx, table.serialize().as_bytes(), timestamp())
}

pub fn add_group(vol: &mut Volume, ctx: &OpCtx, name: &str) -> Result<(), FsError> {
    mutate_users(vol, ctx, |t| t.add_group(name))
}

pub fn remove_group(vol: &mut Volume, ctx: &OpCtx, name: &str) -> Result<(), FsError> {
    mutate_users(vol, ctx, |t| t.remove_group(name))
}

pub fn add_user(
    vol: &mut Volume,
    ctx: &OpCtx,
    user: &str,
    password: &str,
    group: &str,
) -> Result<(), FsError> {
    mutate_users(vol, ctx, |t| t.add_user(user, password, group))
}

pub fn remove_user(vol: &mut Volume, ctx: &OpCtx, user: &str) -> Result<(), FsError> {
    mutate_users(vol, ctx, |t| t.remove_user(user))
}

pub fn change_user_group(
    vol: &mut Volume,
    ctx: &OpCtx,
    user: &str,
    group: &str,
) -> Result<(), FsError> {
    mutate_users(vol, ctx, |t| t.change_user_group(user, group))
}

// ---- loss and recovery primitives ----

/// Zeroes both bitmaps, the inode table and the block area. The
/// superblock and the journal are left untouched.
pub(crate) fn wipe_structures(vol: &mut Volume) -> Result<(), FsError> {
    let prefix = vol.reserved_prefix();
    let (bm_inodes, bm_blocks, inode_table, block_area) = vol.region_sizes();
    vol.zero_region(prefix, bm_inodes + bm_blocks + inode_table + block_area)
}

/// Re-runs the `mkfs` initialisation against wiped structures, resetting
/// the superblock counters but preserving the journal.
pub(crate) fn reinit(vol: &mut Volume) -> Result<(), FsError> {
    wipe_structures(vol)?;
    vol.sb.free_inodes = vol.sb.inode_count;
    vol.sb.free_blocks = vol.sb.block_count;
    vol.sb.first_free_inode = 0;
    vol.sb.first_free_block = 0;
    vol.flush_sb()?;
    init_structures(vol, timestamp())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn glob_patterns() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*.txt", "users.txt"));
        assert!(!glob_match("*.txt", "users.dat"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("u*s.t?t", "users.txt"));
        assert!(glob_match("", ""));
        assert!(!glob_match("", "x"));
    }

    #[test]
    fn generated_content_cycles_digits() {
        assert_eq!(generated_content(12), b"012345678901".to_vec());
        assert!(generated_content(0).is_empty());
    }
}
