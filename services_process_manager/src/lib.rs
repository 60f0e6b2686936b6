//! # Process Manager Service
//!
//! The reserved service every process talks to about process lifetimes.
//!
//! ## Philosophy
//!
//! The kernel only knows slots and states. Everything with policy in it
//! lives here:
//! - Spawn: resolve a program name, reserve a killable slot, load the
//!   image, make it schedulable
//! - Exit: free the sender's slot
//! - Boot: load the non-killable kernel services

pub mod manager;

pub use manager::{NameResolver, ProcessManager, ProcessManagerError};
