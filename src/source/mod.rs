//! Source Module
//!
//! Concrete [`Source`](crate::cache::Source) implementations.
//!
//! # Sources
//! - [`MemorySource`]: HashMap-backed, records every call
//! - [`FileSource`]: one file per key inside a directory

mod file;
mod memory;

pub use file::{validate_key, FileSource, MAX_KEY_LENGTH};
pub use memory::{MemorySource, MemorySourceError};
