//! CLI command implementations.

pub mod blob;
pub mod checksum;
pub mod connect;
pub mod root;
pub mod url;

/// Result type shared by all commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;
