//! Command implementations.
//!
//! Commands that only touch the filesystem live here; commands that need the
//! graph engine run through the CLI's application context.

pub mod init;
