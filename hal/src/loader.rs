//! Program image loading

use crate::block_device::BlockError;
use crate::file::BlockReader;
use core::fmt;
use core_types::Pid;

/// Errors raised while loading a program image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// Reading the image failed
    Read(BlockError),
    /// The image is malformed
    InvalidImage,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "image read failed: {}", err),
            Self::InvalidImage => write!(f, "invalid program image"),
        }
    }
}

impl From<BlockError> for LoadError {
    fn from(err: BlockError) -> Self {
        Self::Read(err)
    }
}

/// Loads executable images into a process's address space
pub trait ImageLoader {
    /// Loads the image read through `reader` for `pid`
    ///
    /// Returns the entry address.
    fn load_program(&mut self, pid: Pid, reader: &mut dyn BlockReader) -> Result<usize, LoadError>;
}
