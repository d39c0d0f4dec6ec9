//! Blob transfer commands.

use super::CommandResult;
use rootsync_client::{RemoteStorage, RemoteStorageWriter, RequestBody};
use rootsync_protocol::ContentHash;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Downloads a blob to `dest`, or to `out` when no destination is given.
pub fn get(
    storage: &dyn RemoteStorage,
    hash: &ContentHash,
    name: &str,
    dest: Option<&Path>,
    out: &mut dyn Write,
) -> CommandResult<u64> {
    let mut reader = storage.get_reader(hash, name)?;
    let copied = match dest {
        Some(path) => {
            let mut file = File::create(path)
                .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
            let copied = io::copy(&mut reader, &mut file)?;
            file.sync_all()?;
            copied
        }
        None => io::copy(&mut reader, out)?,
    };
    reader.close();
    info!(%hash, bytes = copied, "downloaded blob");
    Ok(copied)
}

/// Uploads a file as blob `hash`.
///
/// The file is sent as a seekable body, so it carries a checksum.
pub fn put(
    storage: &dyn RemoteStorageWriter,
    hash: &ContentHash,
    path: &Path,
    name: Option<&str>,
) -> CommandResult<u64> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let len = file.metadata()?.len();
    let default_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| hash.to_string());
    let name = name.unwrap_or(&default_name);
    storage.get_writer(hash, name, RequestBody::seekable(file))?;
    info!(%hash, name, bytes = len, "uploaded blob");
    Ok(len)
}
