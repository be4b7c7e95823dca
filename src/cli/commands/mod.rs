//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod fingerprint;
pub mod init;
pub mod serve;
pub mod sources;
pub mod warm;
