//! Root index commands.

use super::CommandResult;
use rootsync_client::{RemoteStorage, RemoteStorageWriter};
use rootsync_protocol::{ContentHash, Generation};
use serde::Serialize;
use std::io::Write;
use tracing::info;

#[derive(Debug, Serialize)]
struct RootView<'a> {
    hash: &'a str,
    generation: u64,
}

/// Prints the current root hash and generation.
pub fn show(storage: &dyn RemoteStorage, format: &str, out: &mut dyn Write) -> CommandResult {
    let (hash, generation) = storage.get_root_index()?;
    match format {
        "json" => {
            let view = RootView {
                hash: hash.as_str(),
                generation: generation.value(),
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
        }
        "text" => {
            if hash.is_empty() {
                writeln!(out, "(empty)  generation {generation}")?;
            } else {
                writeln!(out, "{hash}  generation {generation}")?;
            }
        }
        other => return Err(format!("unknown format {other:?} (text, json)").into()),
    }
    Ok(())
}

/// Compare-and-swap of the root pointer against `generation`.
///
/// A stale generation is reported with the server's current one so the
/// caller can resynchronize.
pub fn write(
    storage: &dyn RemoteStorageWriter,
    reader: &dyn RemoteStorage,
    hash: &ContentHash,
    generation: Generation,
    out: &mut dyn Write,
) -> CommandResult<Generation> {
    match storage.update_root_index(hash, generation) {
        Ok(next) => {
            info!(%hash, %next, "root updated");
            writeln!(out, "{hash}  generation {next}")?;
            Ok(next)
        }
        Err(e) if e.is_wrong_generation() => {
            let (_, current) = reader.get_root_index()?;
            Err(format!(
                "generation {generation} is stale; the root is at generation {current}"
            )
            .into())
        }
        Err(e) => Err(e.into()),
    }
}
