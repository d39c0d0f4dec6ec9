//! Checksum command implementation.

use super::CommandResult;
use rootsync_protocol::Checksum;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Computes the CRC32C of a file.
pub fn checksum_file(path: &Path) -> CommandResult<Checksum> {
    let mut file =
        File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    Ok(Checksum::from_reader(&mut file)?)
}

/// Runs the checksum command.
pub fn run(path: &Path, out: &mut dyn Write) -> CommandResult {
    let checksum = checksum_file(path)?;
    writeln!(out, "{}  {}", checksum.header_value(), path.display())?;
    Ok(())
}
