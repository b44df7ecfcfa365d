//! Namespace behavior: directories, links, rename, and teardown across
//! operation sequences.

use memfs_core::{Attributes, DirEntry, FsError, Filesystem, NodeKind, ROOT_NODE};

/// Collect the entry names of a directory in listing order.
fn names_of(fs: &Filesystem, path: &str) -> Vec<String> {
    let handle = fs.opendir(path).unwrap();
    let entries: Vec<DirEntry> = fs.readdir(&handle).unwrap();
    fs.releasedir(handle).unwrap();
    entries.into_iter().map(|e| e.name).collect()
}

#[test]
fn test_rmdir_refuses_populated_directory() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mkdir("/a/b", 0o755, 0, 0).unwrap();

    assert_eq!(fs.rmdir("/a"), Err(FsError::NotEmpty));

    // the failed removal must leave the tree unchanged
    assert!(fs.getattr("/a").is_ok());
    assert!(fs.getattr("/a/b").is_ok());
    assert_eq!(fs.getattr("/a").unwrap().nlink, 3);

    fs.rmdir("/a/b").unwrap();
    fs.rmdir("/a").unwrap();
    assert_eq!(fs.getattr("/a"), Err(FsError::NoSuchEntry));
}

#[test]
fn test_mkdir_rmdir_restores_previous_state() {
    let mut fs: Filesystem = Filesystem::new();
    let before_count: usize = fs.node_count();
    let before_root: Attributes = fs.getattr("/").unwrap();

    fs.mkdir("/d", 0o755, 0, 0).unwrap();
    fs.rmdir("/d").unwrap();

    assert_eq!(fs.node_count(), before_count);
    assert_eq!(fs.getattr("/").unwrap(), before_root);
    assert_eq!(names_of(&fs, "/"), vec![".", ".."]);
}

#[test]
fn test_rename_within_directory() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mknod("/a/x", 0o644, 0, 0).unwrap();

    fs.rename("/a/x", "/a/y").unwrap();

    assert_eq!(names_of(&fs, "/a"), vec![".", "..", "y"]);
    assert_eq!(fs.getattr("/a/x"), Err(FsError::NoSuchEntry));
    assert!(fs.getattr("/a/y").is_ok());
}

#[test]
fn test_rename_into_descendant_rejected() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mkdir("/b", 0o755, 0, 0).unwrap();

    assert_eq!(fs.rename("/a", "/a/c"), Err(FsError::InvalidPath));
    assert!(fs.getattr("/a").is_ok());
}

#[test]
fn test_rename_roundtrip_is_noop() {
    let mut fs: Filesystem = Filesystem::new();
    let created: Attributes = fs.mknod("/f", 0o600, 7, 8).unwrap();

    fs.rename("/f", "/g").unwrap();
    fs.rename("/g", "/f").unwrap();

    assert_eq!(fs.getattr("/f").unwrap(), created);
    assert_eq!(fs.getattr("/g"), Err(FsError::NoSuchEntry));
    assert_eq!(names_of(&fs, "/"), vec![".", "..", "f"]);
}

#[test]
fn test_rename_over_existing_file_releases_target() {
    let mut fs: Filesystem = Filesystem::new();
    let f: Attributes = fs.mknod("/f", 0o644, 0, 0).unwrap();
    fs.mknod("/g", 0o644, 0, 0).unwrap();
    let count_before: usize = fs.node_count();

    fs.rename("/f", "/g").unwrap();

    assert_eq!(fs.getattr("/g").unwrap().ino, f.ino);
    assert_eq!(fs.getattr("/f"), Err(FsError::NoSuchEntry));
    assert_eq!(fs.node_count(), count_before - 1);
}

#[test]
fn test_rename_over_directory_rejected() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mknod("/f", 0o644, 0, 0).unwrap();
    fs.mkdir("/d", 0o755, 0, 0).unwrap();

    assert_eq!(fs.rename("/f", "/d"), Err(FsError::IsADirectory));
}

#[test]
fn test_rename_moves_directory_with_subtree() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mkdir("/b", 0o755, 0, 0).unwrap();
    fs.mknod("/a/f", 0o644, 0, 0).unwrap();

    fs.rename("/a", "/b/a").unwrap();

    assert!(fs.getattr("/b/a/f").is_ok());
    assert_eq!(fs.getattr("/a"), Err(FsError::NoSuchEntry));
}

#[test]
fn test_rename_missing_source() {
    let mut fs: Filesystem = Filesystem::new();
    assert_eq!(fs.rename("/nope", "/g"), Err(FsError::NoSuchEntry));
}

#[test]
fn test_every_listing_begins_with_dots() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mkdir("/a/b", 0o755, 0, 0).unwrap();
    fs.mkdir("/c", 0o755, 0, 0).unwrap();
    fs.mknod("/a/f", 0o644, 0, 0).unwrap();

    for (path, parent) in [("/", "/"), ("/a", "/"), ("/a/b", "/a"), ("/c", "/")] {
        let this: Attributes = fs.getattr(path).unwrap();
        let up: Attributes = fs.getattr(parent).unwrap();

        let handle = fs.opendir(path).unwrap();
        let entries: Vec<DirEntry> = fs.readdir(&handle).unwrap();
        fs.releasedir(handle).unwrap();

        assert_eq!(entries[0].name, ".");
        assert_eq!(entries[0].ino, this.ino);
        assert_eq!(entries[1].name, "..");
        assert_eq!(entries[1].ino, up.ino);
    }
}

#[test]
fn test_file_nlink_matches_referring_entries() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mknod("/f", 0o644, 0, 0).unwrap();
    fs.link("/f", "/a/one").unwrap();
    fs.link("/f", "/a/two").unwrap();

    let target: Attributes = fs.getattr("/f").unwrap();
    assert_eq!(target.nlink, 3);

    // count every non-dot entry in the tree referring to the inode
    let mut referring: u32 = 0;
    for dir in ["/", "/a"] {
        let handle = fs.opendir(dir).unwrap();
        for entry in fs.readdir(&handle).unwrap() {
            if entry.name != "." && entry.name != ".." && entry.ino == target.ino {
                referring += 1;
            }
        }
        fs.releasedir(handle).unwrap();
    }
    assert_eq!(referring, target.nlink);

    fs.unlink("/a/one").unwrap();
    assert_eq!(fs.getattr("/f").unwrap().nlink, 2);
}

#[test]
fn test_directory_nlink_accounting() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();

    // fresh root: self-reference, own dot, own dotdot; plus one child dotdot
    assert_eq!(fs.getattr("/").unwrap().nlink, 4);
    assert_eq!(fs.getattr("/a").unwrap().nlink, 2);

    fs.mkdir("/a/b", 0o755, 0, 0).unwrap();
    assert_eq!(fs.getattr("/a").unwrap().nlink, 3);

    fs.rmdir("/a/b").unwrap();
    assert_eq!(fs.getattr("/a").unwrap().nlink, 2);
}

#[test]
fn test_readdir_reports_kinds() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/d", 0o755, 0, 0).unwrap();
    fs.mknod("/f", 0o644, 0, 0).unwrap();

    let handle = fs.opendir("/").unwrap();
    let entries: Vec<DirEntry> = fs.readdir(&handle).unwrap();
    fs.releasedir(handle).unwrap();

    let kind_of = |name: &str| entries.iter().find(|e| e.name == name).unwrap().kind;
    assert_eq!(kind_of("."), NodeKind::Directory);
    assert_eq!(kind_of("d"), NodeKind::Directory);
    assert_eq!(kind_of("f"), NodeKind::File);
}

#[test]
fn test_root_ino_is_one() {
    let fs: Filesystem = Filesystem::new();
    assert_eq!(fs.getattr("/").unwrap().ino, ROOT_NODE);
}

#[test]
fn test_rmdir_root_is_busy() {
    let mut fs: Filesystem = Filesystem::new();
    assert_eq!(fs.rmdir("/"), Err(FsError::Busy));
    assert!(fs.getattr("/").is_ok());
}

#[test]
fn test_getattr_errors() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mknod("/f", 0o644, 0, 0).unwrap();

    assert_eq!(fs.getattr("/nope"), Err(FsError::NoSuchEntry));
    assert_eq!(fs.getattr("/f/below"), Err(FsError::NotADirectory));
}

#[test]
fn test_teardown_destroys_whole_graph() {
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mkdir("/a/b", 0o755, 0, 0).unwrap();
    fs.mkdir("/a/b/c", 0o755, 0, 0).unwrap();
    fs.mknod("/a/b/f", 0o644, 0, 0).unwrap();
    fs.mknod("/g", 0o644, 0, 0).unwrap();
    fs.link("/g", "/a/link").unwrap();

    assert_eq!(fs.node_count(), 6);
    fs.teardown();
    assert_eq!(fs.node_count(), 0);
}

#[test]
fn test_teardown_survives_moved_directory_backlink() {
    // moving a directory leaves its .. pointing at the old parent; the
    // cycle guard and the drained listings keep teardown safe anyway
    let mut fs: Filesystem = Filesystem::new();
    fs.mkdir("/a", 0o755, 0, 0).unwrap();
    fs.mkdir("/b", 0o755, 0, 0).unwrap();
    fs.mkdir("/a/d", 0o755, 0, 0).unwrap();
    fs.rename("/a/d", "/b/d").unwrap();

    fs.teardown();
    assert_eq!(fs.node_count(), 0);
}

#[test]
fn test_teardown_on_fresh_filesystem() {
    let mut fs: Filesystem = Filesystem::new();
    fs.teardown();
    assert_eq!(fs.node_count(), 0);
}
