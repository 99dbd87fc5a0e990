//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Write-back: Flushes dirty cache entries to the data directory at configured intervals

mod flush;

pub use flush::spawn_flush_task;
