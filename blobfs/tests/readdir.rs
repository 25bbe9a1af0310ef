mod common;

use blobfs_rs::types::{InodeFlags, ROOT_INODE};
use blobfs_rs::{BlobFS, Error, Storage};
use rustix::io::Errno;

use common::*;

fn lists_root<S: Storage>(fs: &BlobFS<S>) {
    let mut dir = fs.open_dir(ROOT_INODE).unwrap();
    assert_eq!(dir.size(), 4);

    let mut names = Vec::new();
    for _ in 0..dir.size() {
        let (dirent, inode, name) = dir.readdir_name().unwrap();
        assert_eq!(fs.stat(inode).unwrap(), dirent.inode);
        names.push(name.into_owned());
    }
    assert_eq!(names, ["a", "docs", "hello.txt", "zeta"]);

    for _ in 0..3 {
        let err = dir.readdir().unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.errno(), Errno::NOENT);
    }
    assert_eq!(dir.tell(), 4);
}

#[test]
fn lists_root_with_every_backend() {
    let blob = sample_blob();
    lists_root(&memory_fs(blob.clone()));
    for chunk_size in [1, 4, 13, 512] {
        lists_root(&chunked_fs(&blob, chunk_size));
    }
}

#[test]
fn empty_directory_is_exhausted_immediately() {
    let fs = memory_fs(sample_blob());
    let inode = fs.resolve_path("/a").unwrap();
    let mut dir = fs.open_dir(inode).unwrap();
    assert_eq!(dir.size(), 0);
    assert!(matches!(dir.readdir(), Err(Error::NotFound(_))));
    assert!(fs.read_dir("/a").unwrap().next().is_none());
}

#[test]
fn seek_and_tell_use_entry_indices() {
    let fs = memory_fs(sample_blob());
    let mut dir = fs.read_dir("/").unwrap();

    dir.seek(2).unwrap();
    assert_eq!(dir.tell(), 2);
    let (_, _, name) = dir.readdir_name().unwrap();
    assert_eq!(name, "hello.txt");
    assert_eq!(dir.tell(), 3);

    dir.seek(4).unwrap();
    assert!(matches!(dir.readdir(), Err(Error::NotFound(_))));

    let err = dir.seek(5).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(dir.tell(), 4);

    dir.seek(0).unwrap();
    assert_eq!(dir.next().unwrap().unwrap().file_name(), "a");
}

#[test]
fn iterator_yields_owned_entries() {
    let fs = memory_fs(sample_blob());
    let entries: Vec<_> = fs
        .read_dir("/docs/")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file_name(), "guide");
    assert_eq!(entries[0].path(), "/docs/guide");
    assert!(entries[0].is_dir());
    assert_eq!(entries[1].file_name(), "readme.md");
    assert_eq!(entries[1].path(), "/docs/readme.md");
    assert!(entries[1].is_file());
    assert_eq!(entries[1].data().size, 7);
}

#[test]
fn listing_by_inode_knows_only_names() {
    let fs = memory_fs(sample_blob());
    let docs = fs.resolve_path("/docs").unwrap();
    let entry = fs.open_dir(docs).unwrap().next().unwrap().unwrap();
    assert_eq!(entry.path(), "guide");
}

#[test]
fn open_dir_on_file_is_rejected() {
    let fs = memory_fs(sample_blob());
    let inode = fs.resolve_path("/zeta").unwrap();
    let err = fs.open_dir(inode).unwrap_err();
    assert!(matches!(err, Error::NotADirectory(_)));
    assert_eq!(err.errno(), Errno::NOTDIR);
    assert!(matches!(fs.read_dir("/hello.txt"), Err(Error::NotADirectory(_))));
}

#[test]
fn open_dir_on_compressed_directory_is_unsupported() {
    let mut blob = hello_blob();
    blob[8] |= InodeFlags::COMPRESSED.bits();
    let fs = memory_fs(blob);
    assert!(matches!(fs.open_dir(ROOT_INODE), Err(Error::Unsupported(_))));
}

#[test]
fn walks_tree_depth_first() {
    let fs = memory_fs(sample_blob());
    let walked: Vec<(usize, String)> = fs
        .walk_dir("/")
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (entry.depth, entry.dir_entry.path())
        })
        .collect();

    let expected = [
        (1, "/a"),
        (1, "/docs"),
        (2, "/docs/guide"),
        (3, "/docs/guide/intro.txt"),
        (2, "/docs/readme.md"),
        (1, "/hello.txt"),
        (1, "/zeta"),
    ];
    let expected: Vec<(usize, String)> = expected
        .iter()
        .map(|(depth, path)| (*depth, path.to_string()))
        .collect();
    assert_eq!(walked, expected);

    let shallow = fs.walk_dir("/docs").unwrap().max_depth(1).count();
    assert_eq!(shallow, 2);
}

#[test]
fn listing_stops_after_malformed_entry() {
    let mut blob = hello_blob();
    // point the only name past the end of the blob
    blob[21..25].copy_from_slice(&1000u32.to_be_bytes());
    let fs = memory_fs(blob);

    let mut dir = fs.read_dir("/").unwrap();
    assert!(matches!(dir.next(), Some(Err(Error::MalformedBlob(_)))));
    assert!(dir.next().is_none());
}

#[test]
fn failed_name_read_keeps_cursor() {
    let mut blob = hello_blob();
    blob[21..25].copy_from_slice(&1000u32.to_be_bytes());
    let fs = memory_fs(blob);

    let mut dir = fs.open_dir(ROOT_INODE).unwrap();
    assert!(matches!(dir.readdir_name(), Err(Error::MalformedBlob(_))));
    assert_eq!(dir.tell(), 0);
    // the entry record itself is intact
    let (dirent, inode) = dir.readdir().unwrap();
    assert_eq!(dirent.name_offset, 1000);
    assert_eq!(inode, 25);
    assert_eq!(dir.tell(), 1);

    // "hello.txt\0" lives at 9..19
    let blob = hello_blob();
    let reader = FakeReader::new(&blob).failing(9..19);
    let fs = BlobFS::from_reader(reader, blob.len() as u64, 2).unwrap();
    let mut dir = fs.open_dir(ROOT_INODE).unwrap();
    assert!(matches!(dir.readdir_name(), Err(Error::Backend(_))));
    assert_eq!(dir.tell(), 0);
}

#[test]
fn walk_reports_directory_it_cannot_open() {
    let mut blob = sample_blob();
    let (guide, _) = memory_fs(blob.clone()).stat_path("/docs/guide").unwrap();
    blob[guide as usize + 8] |= InodeFlags::COMPRESSED.bits();
    let fs = memory_fs(blob);

    let walked: Vec<String> = fs
        .walk_dir("/")
        .unwrap()
        .map(|entry| match entry {
            Ok(entry) => entry.dir_entry.path(),
            Err(err) => format!("error: {}", err),
        })
        .collect();

    assert_eq!(
        walked,
        [
            "/a",
            "/docs",
            "/docs/guide",
            "error: compressed directory index not supported",
            "/docs/readme.md",
            "/hello.txt",
            "/zeta",
        ]
    );
}
