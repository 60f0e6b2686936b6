//! # Directory Service
//!
//! Resolves names inside directory files.
//!
//! ## Format
//!
//! A directory is a file whose first block holds text entries of the form
//! `name ino ` (name, space, decimal inode, space), NUL-terminated:
//!
//! ```text
//! ls 3 cat 4 echo 5 
//! ```
//!
//! ## Operations
//!
//! - `lookup(dir_ino, name)`: exact-name match, returning the inode
//! - `handle(DirRequest)`: the same over the service wire types

pub mod service;

pub use service::{DirError, DirectoryService};
