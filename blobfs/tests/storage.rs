mod common;

use std::borrow::Cow;
use std::io::{self, Write};

use blobfs_rs::types::ROOT_INODE;
use blobfs_rs::{BlobFS, ChunkedStorage, Error, MemoryStorage, Storage};

use common::*;

#[test]
fn chunked_strings_span_windows() {
    let blob = b"\0a-rather-long-name\0tail".to_vec();
    let reader = FakeReader::new(&blob);
    let storage = ChunkedStorage::new(reader.clone(), blob.len() as u64, 3).unwrap();

    let name = storage.fetch_str(1).unwrap();
    assert!(matches!(name, Cow::Owned(_)));
    assert_eq!(name.as_ref(), b"a-rather-long-name");
    assert_eq!(storage.fetch_str(0).unwrap().as_ref(), b"");
    assert_eq!(reader.largest_read(), 3);
}

#[test]
fn backends_agree() {
    let blob = sample_blob();
    let memory = MemoryStorage::new(blob.clone());
    for chunk_size in [1, 2, 9, 1 << 16] {
        let chunked = ChunkedStorage::new(FakeReader::new(&blob), blob.len() as u64, chunk_size)
            .unwrap();
        assert_eq!(chunked.len(), memory.len());
        for offset in [0u32, 9, 10, 20] {
            assert_eq!(
                chunked.fetch(offset, 9).unwrap(),
                memory.fetch(offset, 9).unwrap()
            );
        }
    }
}

#[test]
fn unterminated_string_is_malformed() {
    let blob = b"abc".to_vec();
    let memory = MemoryStorage::new(blob.clone());
    assert!(matches!(memory.fetch_str(0), Err(Error::MalformedBlob(_))));

    let chunked = ChunkedStorage::new(FakeReader::new(&blob), 3, 2).unwrap();
    assert!(matches!(chunked.fetch_str(1), Err(Error::MalformedBlob(_))));
    assert!(matches!(chunked.fetch_str(3), Err(Error::MalformedBlob(_))));
}

#[test]
fn out_of_range_offsets_are_malformed() {
    let mut blob = hello_blob();
    // directory entries claimed far past the end of the blob
    blob[4..8].copy_from_slice(&0xffff_fff0u32.to_be_bytes());
    let fs = memory_fs(blob.clone());
    assert!(matches!(
        fs.resolve_path("/hello.txt"),
        Err(Error::MalformedBlob(_))
    ));
    let mut dir = fs.open_dir(ROOT_INODE).unwrap();
    assert!(matches!(dir.readdir(), Err(Error::MalformedBlob(_))));

    let fs = chunked_fs(&blob, 4);
    assert!(matches!(
        fs.resolve_path("/hello.txt"),
        Err(Error::MalformedBlob(_))
    ));
}

#[test]
fn file_content_past_end_is_malformed() {
    let mut blob = hello_blob();
    // declare 200 bytes of content for hello.txt
    blob[25..29].copy_from_slice(&200u32.to_be_bytes());
    let fs = memory_fs(blob);
    let file = fs.open("/hello.txt").unwrap();
    let mut buf = [0u8; 16];
    assert!(matches!(file.pread(&mut buf, 0), Err(Error::MalformedBlob(_))));
    // within the blob is still readable
    assert_eq!(file.pread(&mut buf[..2], 0).unwrap(), 2);
}

#[test]
fn truncated_blob_is_rejected() {
    let err = BlobFS::from_memory(vec![0u8; 8]).unwrap_err();
    assert!(matches!(err, Error::MalformedBlob(_)));
    assert_eq!(err.errno(), rustix::io::Errno::IO);
    assert!(BlobFS::from_memory(Vec::new()).is_err());
}

#[test]
fn root_inode_to_stat() {
    let fs = memory_fs(hello_blob());
    let root = fs.root().unwrap();
    assert!(root.is_dir());
    assert_eq!(root.size, 1);
    assert_eq!(root.data_offset, 21);
    assert_eq!(fs.stat(25).unwrap().data_offset, 19);
}

#[test]
fn backend_errors_pass_through() {
    let blob = hello_blob();
    let reader = FakeReader::new(&blob).failing(0..1);
    let err = BlobFS::from_reader(reader, blob.len() as u64, 16).unwrap_err();
    match err {
        Error::Backend(err) => assert_eq!(err.kind(), io::ErrorKind::TimedOut),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn short_medium_is_unexpected_eof() {
    let blob = hello_blob();
    // the medium holds less than the declared blob size
    let fs = BlobFS::from_reader(FakeReader::new(&blob[..30]), blob.len() as u64, 8).unwrap();
    match fs.resolve_path("/hello.txt") {
        Err(Error::Backend(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn file_backed_chunked_storage() {
    let blob = sample_blob();
    let mut image = tempfile::NamedTempFile::new().unwrap();
    image.write_all(&blob).unwrap();
    image.flush().unwrap();

    let file = std::fs::File::open(image.path()).unwrap();
    let fs = BlobFS::new(ChunkedStorage::open_file(file, 5).unwrap()).unwrap();
    let mut buf = [0u8; 16];
    let n = fs.open("/docs/guide/intro.txt").unwrap().read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"intro");

    let mapped = unsafe { memmap2::Mmap::map(image.as_file()) }.unwrap();
    let fs = BlobFS::from_memory(mapped).unwrap();
    let n = fs.open("/zeta").unwrap().read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"z");
}

#[test]
fn oversized_fetch_is_rejected_before_reading() {
    let blob = hello_blob();
    let reader = FakeReader::new(&blob);
    let storage = ChunkedStorage::new(reader.clone(), blob.len() as u64, 16).unwrap();

    assert!(matches!(
        storage.fetch(0, u32::MAX),
        Err(Error::MalformedBlob(_))
    ));
    assert!(matches!(storage.fetch(30, 5), Err(Error::MalformedBlob(_))));
    assert_eq!(reader.reads(), 0);
}
