//! End-to-end filesystem scenarios against real disk image files.

use disk::{DiskManager, Fit, PartType, PartitionRef};
use std::path::{Path, PathBuf};
use vfs::users::USERS_PATH;
use vfs::{Credentials, Filesystem, Fs2, Fs3, OpCtx, Volume};

const MIB: i64 = 1024 * 1024;
const KIB: i64 = 1024;

struct TempDisk(PathBuf);

impl TempDisk {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!(
            "vfs-test-{}-{}.dsk",
            std::process::id(),
            utils::util::timestamp_nanos()
        )))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDisk {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn setup(part_size: i64) -> (TempDisk, DiskManager, PartitionRef) {
    let disk = TempDisk::new();
    let dm = DiskManager::new();
    dm.mkdisk(disk.path(), 4 * MIB, Fit::First).unwrap();
    dm.fdisk_add(disk.path(), "Part1", part_size, PartType::Primary, Fit::First)
        .unwrap();
    let r = PartitionRef::new(disk.path(), "Part1");
    (disk, dm, r)
}

fn setup_2fs(part_size: i64) -> (TempDisk, DiskManager, PartitionRef, Fs2) {
    let (disk, dm, r) = setup(part_size);
    let fs = Fs2::new();
    fs.mkfs(&dm, &r).unwrap();
    (disk, dm, r, fs)
}

fn setup_3fs(part_size: i64) -> (TempDisk, DiskManager, PartitionRef, Fs3) {
    let (disk, dm, r) = setup(part_size);
    let fs = Fs3::default();
    fs.mkfs(&dm, &r).unwrap();
    (disk, dm, r, fs)
}

/// Superblock and bitmap state invariants checked after the operations
/// of each test.
fn check_counters(dm: &DiskManager, r: &PartitionRef) {
    let mut vol = Volume::open(dm, r).unwrap();
    vol.sb.check().unwrap();
    let mut used_inodes = 0;
    for i in 0..vol.sb.inode_count {
        if vol.inode_used(i).unwrap() {
            used_inodes += 1;
        }
    }
    let mut used_blocks = 0;
    for i in 0..vol.sb.block_count {
        if vol.block_used(i).unwrap() {
            used_blocks += 1;
        }
    }
    assert_eq!(vol.sb.free_inodes, vol.sb.inode_count - used_inodes);
    assert_eq!(vol.sb.free_blocks, vol.sb.block_count - used_blocks);

    // Every reachable block pointer lands on a block marked used.
    for i in 0..vol.sb.inode_count {
        if !vol.inode_used(i).unwrap() {
            continue;
        }
        let inode = vol.read_inode(i).unwrap();
        for block in vol.collect_blocks(&inode).unwrap() {
            assert!(vol.block_used(block).unwrap(), "bloque {} sin marcar", block);
        }
    }
}

#[test]
fn mkfs_marks_root_and_users() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let mut vol = Volume::open(&dm, &r).unwrap();

    // n = floor((131072 - 512) / 324)
    assert_eq!(vol.sb.inode_count, 402);
    assert_eq!(vol.sb.block_count, 1206);
    assert_eq!(vol.sb.free_inodes, 400);
    assert_eq!(vol.sb.free_blocks, 1204);
    assert!(vol.inode_used(0).unwrap());
    assert!(vol.inode_used(1).unwrap());
    assert!(vol.block_used(0).unwrap());
    assert!(vol.block_used(1).unwrap());

    let root = vol.read_inode(0).unwrap();
    assert!(root.is_dir());
    assert_eq!(root.perm, *b"755");
    let users = vol.read_inode(1).unwrap();
    assert!(users.is_file());
    assert_eq!(users.perm, *b"664");

    let content = fs.read_file(&dm, &r, &OpCtx::root(), USERS_PATH).unwrap();
    assert_eq!(content, b"1,G,root\n1,U,root,root,123\n");
    check_counters(&dm, &r);
}

#[test]
fn write_then_read_roundtrip() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let ctx = OpCtx::root();
    fs.mkdir(&dm, &r, &ctx, "/a", false).unwrap();
    fs.mkfile(&dm, &r, &ctx, "/a/b", Some(b"hi"), None).unwrap();
    let content = fs.read_file(&dm, &r, &ctx, "/a/b").unwrap();
    assert_eq!(content, b"hi");
    check_counters(&dm, &r);
}

#[test]
fn deep_mkdir_creates_chain() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let ctx = OpCtx::root();

    assert!(matches!(
        fs.mkdir(&dm, &r, &ctx, "/a/b/c", false),
        Err(vfs::FsError::NoParentFolders)
    ));
    fs.mkdir(&dm, &r, &ctx, "/a/b/c", true).unwrap();

    let mut vol = Volume::open(&dm, &r).unwrap();
    let mut idx = 0;
    for name in ["a", "b", "c"] {
        let inode = vol.read_inode(idx).unwrap();
        idx = vol.dir_find(&inode, name).unwrap().unwrap();
        let child = vol.read_inode(idx).unwrap();
        assert!(child.is_dir());
        // Exactly one folder block with `.` and `..` (plus `b` under `a`,
        // etc.); the leaf holds only the two self entries.
        let entries = vol.dir_entries(idx).unwrap();
        assert!(entries.iter().any(|(n, _)| n == "."));
        assert!(entries.iter().any(|(n, _)| n == ".."));
    }
    let leaf = vol.dir_entries(idx).unwrap();
    assert_eq!(leaf.len(), 2);
    check_counters(&dm, &r);
}

#[test]
fn mkfile_generates_cycling_digits() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let ctx = OpCtx::root();
    fs.mkfile(&dm, &r, &ctx, "/gen", None, Some(15)).unwrap();
    let content = fs.read_file(&dm, &r, &ctx, "/gen").unwrap();
    assert_eq!(content, b"012345678901234");
}

#[test]
fn large_file_uses_indirect_blocks() {
    let (_disk, dm, r, fs) = setup_2fs(256 * KIB);
    let ctx = OpCtx::root();

    // 3000 bytes over 64-byte blocks is 47 blocks: direct, single and
    // double indirect pointers all get exercised.
    let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    fs.mkfile(&dm, &r, &ctx, "/big", Some(&data), None).unwrap();
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/big").unwrap(), data);

    let mut vol = Volume::open(&dm, &r).unwrap();
    let idx = vol.resolve("/big").unwrap().unwrap();
    let inode = vol.read_inode(idx).unwrap();
    assert_eq!(inode.size, 3000);
    assert!(inode.i_block[12] != -1);
    assert!(inode.i_block[13] != -1);
    assert_eq!(vol.collect_blocks(&inode).unwrap().len(), 47);
    check_counters(&dm, &r);

    // Truncating rewrite returns the extra blocks to the pool.
    fs.write_file(&dm, &r, &ctx, "/big", b"corto", false).unwrap();
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/big").unwrap(), b"corto");
    check_counters(&dm, &r);
}

#[test]
fn edit_append_and_truncate() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let ctx = OpCtx::root();
    fs.mkfile(&dm, &r, &ctx, "/f", Some(b"hola"), None).unwrap();
    fs.write_file(&dm, &r, &ctx, "/f", b" mundo", true).unwrap();
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/f").unwrap(), b"hola mundo");
    fs.write_file(&dm, &r, &ctx, "/f", b"x", false).unwrap();
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/f").unwrap(), b"x");
}

#[test]
fn rename_copy_move() {
    let (_disk, dm, r, fs) = setup_2fs(256 * KIB);
    let ctx = OpCtx::root();
    fs.mkdir(&dm, &r, &ctx, "/src", false).unwrap();
    fs.mkdir(&dm, &r, &ctx, "/dst", false).unwrap();
    fs.mkfile(&dm, &r, &ctx, "/src/f", Some(b"data"), None).unwrap();

    fs.rename(&dm, &r, &ctx, "/src/f", "/src/g").unwrap();
    assert!(matches!(
        fs.read_file(&dm, &r, &ctx, "/src/f"),
        Err(vfs::FsError::FileNotFound)
    ));
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/src/g").unwrap(), b"data");

    fs.copy(&dm, &r, &ctx, "/src", "/dst/copia").unwrap();
    assert_eq!(
        fs.read_file(&dm, &r, &ctx, "/dst/copia/g").unwrap(),
        b"data"
    );
    // The copy is a fresh tree; editing it leaves the source alone.
    fs.write_file(&dm, &r, &ctx, "/dst/copia/g", b"otro", false)
        .unwrap();
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/src/g").unwrap(), b"data");

    fs.mv(&dm, &r, &ctx, "/src/g", "/dst/h").unwrap();
    assert!(matches!(
        fs.read_file(&dm, &r, &ctx, "/src/g"),
        Err(vfs::FsError::FileNotFound)
    ));
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/dst/h").unwrap(), b"data");

    // Moving a directory under itself is rejected.
    assert!(matches!(
        fs.mv(&dm, &r, &ctx, "/dst", "/dst/copia/adentro"),
        Err(vfs::FsError::InvalidParam)
    ));
    check_counters(&dm, &r);
}

#[test]
fn find_with_globs() {
    let (_disk, dm, r, fs) = setup_2fs(256 * KIB);
    let ctx = OpCtx::root();
    fs.mkdir(&dm, &r, &ctx, "/docs", false).unwrap();
    fs.mkfile(&dm, &r, &ctx, "/docs/a.txt", Some(b""), None).unwrap();
    fs.mkfile(&dm, &r, &ctx, "/docs/b.txt", Some(b""), None).unwrap();
    fs.mkfile(&dm, &r, &ctx, "/docs/c.dat", Some(b""), None).unwrap();

    let all = fs.find(&dm, &r, &ctx, "/", None, 100).unwrap();
    assert!(all.contains(&"/docs".to_owned()));
    assert!(all.contains(&"/docs/c.dat".to_owned()));
    assert!(all.contains(&"/users.txt".to_owned()));

    let txt = fs.find(&dm, &r, &ctx, "/docs", Some("*.txt"), 100).unwrap();
    assert_eq!(txt, vec!["/docs/a.txt", "/docs/b.txt"]);

    let one = fs.find(&dm, &r, &ctx, "/docs", Some("?.txt"), 1).unwrap();
    assert_eq!(one.len(), 1);
}

#[test]
fn users_table_scenario() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let ctx = OpCtx::root();
    fs.add_group(&dm, &r, &ctx, "devs").unwrap();
    fs.add_user(&dm, &r, &ctx, "alice", "s", "devs").unwrap();

    let content = fs.read_file(&dm, &r, &ctx, USERS_PATH).unwrap();
    assert_eq!(
        content,
        b"1,G,root\n1,U,root,root,123\n2,G,devs\n2,U,alice,devs,s\n"
    );

    let creds = vfs::authenticate(&dm, &r, "alice", "s").unwrap();
    assert_eq!((creds.uid, creds.gid), (2, 2));
    assert!(matches!(
        vfs::authenticate(&dm, &r, "alice", "mal"),
        Err(vfs::FsError::InvalidCredentials)
    ));
}

fn alice_ctx(dm: &DiskManager, r: &PartitionRef, fs: &Fs2) -> OpCtx {
    let root = OpCtx::root();
    fs.add_group(dm, r, &root, "devs").unwrap();
    fs.add_user(dm, r, &root, "alice", "s", "devs").unwrap();
    OpCtx::new(Credentials {
        user: "alice".to_owned(),
        group: "devs".to_owned(),
        uid: 2,
        gid: 2,
    })
}

#[test]
fn permissions_deny_non_owner() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let root = OpCtx::root();
    let alice = alice_ctx(&dm, &r, &fs);

    fs.mkfile(&dm, &r, &root, "/privado", Some(b"secreto"), None)
        .unwrap();
    fs.chmod(&dm, &r, &root, "/privado", utils::perm::Perm::parse("600").unwrap())
        .unwrap();

    assert!(matches!(
        fs.read_file(&dm, &r, &alice, "/privado"),
        Err(vfs::FsError::Unauthorized(_))
    ));
    assert!(matches!(
        fs.chmod(&dm, &r, &alice, "/privado", utils::perm::Perm::parse("777").unwrap()),
        Err(vfs::FsError::Unauthorized(_))
    ));

    fs.chown(&dm, &r, &root, "/privado", "alice", "devs").unwrap();
    assert_eq!(
        fs.read_file(&dm, &r, &alice, "/privado").unwrap(),
        b"secreto"
    );
}

#[test]
fn remove_is_all_or_nothing() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let root = OpCtx::root();
    let alice = alice_ctx(&dm, &r, &fs);

    fs.mkdir(&dm, &r, &root, "/d", false).unwrap();
    fs.chmod(&dm, &r, &root, "/d", utils::perm::Perm::parse("777").unwrap())
        .unwrap();
    fs.mkfile(&dm, &r, &alice, "/d/mio", Some(b"1"), None).unwrap();
    fs.mkfile(&dm, &r, &root, "/d/ajeno", Some(b"2"), None).unwrap();

    // One denied descendant aborts the whole removal with nothing freed.
    assert!(matches!(
        fs.remove(&dm, &r, &alice, "/d"),
        Err(vfs::FsError::Unauthorized(_))
    ));
    assert_eq!(fs.read_file(&dm, &r, &root, "/d/mio").unwrap(), b"1");
    assert_eq!(fs.read_file(&dm, &r, &root, "/d/ajeno").unwrap(), b"2");

    // Root removes it whole.
    fs.remove(&dm, &r, &root, "/d").unwrap();
    assert!(matches!(
        fs.read_file(&dm, &r, &root, "/d/mio"),
        Err(vfs::FsError::FileNotFound)
    ));
    check_counters(&dm, &r);

    assert!(matches!(
        fs.remove(&dm, &r, &root, "/"),
        Err(vfs::FsError::InvalidParam)
    ));
}

#[test]
fn missing_paths_have_distinct_errors() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let ctx = OpCtx::root();
    fs.mkdir(&dm, &r, &ctx, "/d", false).unwrap();

    // A path where no component resolves at all.
    assert!(matches!(
        fs.chmod(&dm, &r, &ctx, "/nada", utils::perm::Perm::parse("700").unwrap()),
        Err(vfs::FsError::NoSuchPath)
    ));
    assert!(matches!(
        fs.remove(&dm, &r, &ctx, "/nada/x"),
        Err(vfs::FsError::NoSuchPath)
    ));

    // An existing parent whose entry is simply missing.
    assert!(matches!(
        fs.remove(&dm, &r, &ctx, "/d/nada"),
        Err(vfs::FsError::PathNotFound)
    ));
}

#[test]
fn journaling_is_rejected_on_2fs() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    assert!(matches!(
        fs.journaling(&dm, &r),
        Err(vfs::FsError::Unsupported)
    ));
    assert!(matches!(fs.loss(&dm, &r), Err(vfs::FsError::Unsupported)));
}

#[test]
fn loss_then_recovery_rebuilds_from_journal() {
    let (_disk, dm, r, fs) = setup_3fs(256 * KIB);
    let ctx = OpCtx::root();
    fs.mkdir(&dm, &r, &ctx, "/a", false).unwrap();
    fs.mkfile(&dm, &r, &ctx, "/a/b", Some(b"zz"), None).unwrap();

    fs.loss(&dm, &r).unwrap();

    // The journal survives the loss: mkfs, mkdir and mkfile, oldest
    // first with non-decreasing timestamps.
    let entries = fs.journaling(&dm, &r).unwrap();
    let ops: Vec<String> = entries.iter().map(|e| e.op_str()).collect();
    assert_eq!(ops, vec!["mkfs", "mkdir", "mkfile"]);
    assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    fs.recovery(&dm, &r).unwrap();
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/a/b").unwrap(), b"zz");
    assert_eq!(
        fs.read_file(&dm, &r, &ctx, USERS_PATH).unwrap(),
        b"1,G,root\n1,U,root,root,123\n"
    );
    check_counters(&dm, &r);

    // Recovery is idempotent: running it again changes nothing.
    fs.recovery(&dm, &r).unwrap();
    assert_eq!(fs.read_file(&dm, &r, &ctx, "/a/b").unwrap(), b"zz");
    check_counters(&dm, &r);
}

#[test]
fn journal_wraps_at_capacity() {
    let (_disk, dm, r, fs) = setup_3fs(512 * KIB);
    let ctx = OpCtx::root();
    fs.mkdir(&dm, &r, &ctx, "/w", false).unwrap();
    // 60 edits overflow the 50-entry window.
    for i in 0..60 {
        let content = format!("v{}", i);
        if i == 0 {
            fs.mkfile(&dm, &r, &ctx, "/w/f", Some(content.as_bytes()), None)
                .unwrap();
        } else {
            fs.write_file(&dm, &r, &ctx, "/w/f", content.as_bytes(), false)
                .unwrap();
        }
    }
    let entries = fs.journaling(&dm, &r).unwrap();
    assert_eq!(entries.len(), 50);
    assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    // The oldest surviving entry is no longer the mkfs record.
    assert_ne!(entries[0].op_str(), "mkfs");
    assert_eq!(entries.last().unwrap().aux_str(), "v59");
}

#[test]
fn tree_reports_structure() {
    let (_disk, dm, r, fs) = setup_2fs(128 * KIB);
    let ctx = OpCtx::root();
    fs.mkdir(&dm, &r, &ctx, "/a", false).unwrap();
    fs.mkfile(&dm, &r, &ctx, "/a/f", Some(b"x"), None).unwrap();

    let tree = fs.tree(&dm, &r, &ctx, "/").unwrap();
    assert_eq!(tree.name, "/");
    assert!(tree.is_dir);
    let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"users.txt"));
    assert!(names.contains(&"a"));
    let a = tree.children.iter().find(|c| c.name == "a").unwrap();
    assert_eq!(a.children.len(), 1);
    assert_eq!(a.children[0].name, "f");
    assert!(!a.children[0].is_dir);
}
