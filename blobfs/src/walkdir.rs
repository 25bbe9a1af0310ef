use crate::dirent::{DirEntry, ReadDir};
use crate::storage::Storage;
use crate::{BlobFS, Error, Result};

/// An iterator for recursively walking a directory tree.
///
/// Created by [`BlobFS::walk_dir`](crate::BlobFS::walk_dir). Entries are
/// yielded depth-first, each directory's children in stored order right
/// after the directory itself. A directory that cannot be opened is still
/// yielded, followed by the error, and the walk then skips its children.
#[derive(Debug)]
pub struct WalkDir<'a, S> {
    fs: &'a BlobFS<S>,
    dir_stack: Vec<(usize, ReadDir<'a, S>)>,
    max_depth: usize,
    /// Failure to open a directory that was already yielded, reported next.
    pending: Option<Error>,
}

/// A single entry returned by [`WalkDir`].
#[derive(Debug, Clone)]
pub struct WalkDirEntry {
    /// The depth of this entry relative to the starting directory (1-indexed).
    pub depth: usize,
    pub dir_entry: DirEntry,
}

impl<'a, S: Storage> WalkDir<'a, S> {
    pub(crate) fn new(fs: &'a BlobFS<S>, root: ReadDir<'a, S>) -> Self {
        WalkDir {
            fs,
            dir_stack: vec![(1, root)],
            max_depth: 0,
            pending: None,
        }
    }

    /// Sets the maximum depth to descend into subdirectories.
    ///
    /// A depth of 1 means only immediate children are returned.
    /// A depth of 0 (the default) means unlimited depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn get_walk_dir_entry(&mut self, dir_entry: DirEntry, depth: usize) -> WalkDirEntry {
        if (depth < self.max_depth || self.max_depth == 0) && dir_entry.is_dir() {
            match self.fs.open_dir_at(dir_entry.inode(), dir_entry.path()) {
                Ok(child_dir) => self.dir_stack.push((depth + 1, child_dir)),
                Err(err) => self.pending = Some(err),
            }
        }

        WalkDirEntry { depth, dir_entry }
    }

    fn next_entry(&mut self) -> Option<Result<WalkDirEntry>> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }

        loop {
            let (depth, next_item) = {
                let (depth, dir) = self.dir_stack.last_mut()?;
                (*depth, dir.next())
            };

            match next_item {
                Some(Ok(entry)) => return Some(Ok(self.get_walk_dir_entry(entry, depth))),
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.dir_stack.pop();
                }
            }
        }
    }
}

impl<S: Storage> Iterator for WalkDir<'_, S> {
    type Item = Result<WalkDirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry()
    }
}
