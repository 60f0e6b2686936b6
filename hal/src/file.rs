//! File-level block access
//!
//! Files are addressed by inode number and read one block at a time.

use crate::block_device::{BlockError, BLOCK_SIZE};

#[cfg(feature = "alloc")]
use crate::block_device::{BlockDevice, RamDisk};
#[cfg(feature = "alloc")]
extern crate alloc;

/// Read access to files by inode
pub trait FileStore {
    /// Reads block `offset` of file `ino` into `buf`
    fn read_file_block(
        &mut self,
        ino: u32,
        offset: u32,
        buf: &mut [u8; BLOCK_SIZE],
    ) -> Result<(), BlockError>;
}

/// Sequential source of blocks handed to an image loader
pub trait BlockReader {
    /// Reads block `offset` of the underlying file into `buf`
    fn read_block_at(&mut self, offset: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), BlockError>;
}

/// [`BlockReader`] over one file of a [`FileStore`]
pub struct FileBlocks<'a, F: FileStore + ?Sized> {
    store: &'a mut F,
    ino: u32,
}

impl<'a, F: FileStore + ?Sized> FileBlocks<'a, F> {
    pub fn new(store: &'a mut F, ino: u32) -> Self {
        Self { store, ino }
    }
}

impl<F: FileStore + ?Sized> BlockReader for FileBlocks<'_, F> {
    fn read_block_at(&mut self, offset: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), BlockError> {
        self.store.read_file_block(self.ino, offset, buf)
    }
}

/// Files laid out contiguously on a [`RamDisk`]
#[cfg(feature = "alloc")]
pub struct RamFileStore {
    disk: RamDisk,
    // ino -> (first block, block count)
    extents: alloc::collections::BTreeMap<u32, (u64, u32)>,
}

#[cfg(feature = "alloc")]
impl RamFileStore {
    pub fn new() -> Self {
        Self {
            disk: RamDisk::new(0),
            extents: alloc::collections::BTreeMap::new(),
        }
    }

    /// Stores `bytes` as the contents of `ino`, replacing any previous extent
    pub fn insert(&mut self, ino: u32, bytes: &[u8]) {
        let first = self.disk.append(bytes);
        let count = bytes.len().div_ceil(BLOCK_SIZE).max(1) as u32;
        if bytes.is_empty() {
            self.disk.append(&[0u8; BLOCK_SIZE]);
        }
        self.extents.insert(ino, (first, count));
    }

    pub fn contains(&self, ino: u32) -> bool {
        self.extents.contains_key(&ino)
    }
}

#[cfg(feature = "alloc")]
impl Default for RamFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "alloc")]
impl FileStore for RamFileStore {
    fn read_file_block(
        &mut self,
        ino: u32,
        offset: u32,
        buf: &mut [u8; BLOCK_SIZE],
    ) -> Result<(), BlockError> {
        let &(first, count) = self.extents.get(&ino).ok_or(BlockError::OutOfBounds)?;
        if offset >= count {
            return Err(BlockError::OutOfBounds);
        }
        self.disk.read_block(first + offset as u64, buf)
    }
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;

    #[test]
    fn test_read_file_blocks() {
        let mut store = RamFileStore::new();
        let mut contents = [1u8; BLOCK_SIZE * 2];
        contents[BLOCK_SIZE] = 9;
        store.insert(5, &contents);

        let mut reader = FileBlocks::new(&mut store, 5);
        let mut buf = [0u8; BLOCK_SIZE];
        reader.read_block_at(1, &mut buf).unwrap();
        assert_eq!(buf[0], 9);
        assert_eq!(reader.read_block_at(2, &mut buf), Err(BlockError::OutOfBounds));
    }

    #[test]
    fn test_unknown_inode() {
        let mut store = RamFileStore::new();
        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(
            store.read_file_block(1, 0, &mut buf),
            Err(BlockError::OutOfBounds)
        );
    }

    #[test]
    fn test_empty_file_has_one_zero_block() {
        let mut store = RamFileStore::new();
        store.insert(3, b"");
        let mut buf = [0xAAu8; BLOCK_SIZE];
        store.read_file_block(3, 0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }
}
