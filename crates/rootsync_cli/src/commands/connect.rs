//! Credential loading and client construction.

use super::CommandResult;
use rootsync_client::{BlobStorage, ClientConfig, Endpoints, ReqwestClient, TransportClient};
use rootsync_protocol::AuthTokens;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Connection options gathered from global flags.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Base URL of the backend.
    pub base_url: String,
    /// JSON file holding `devicetoken` and `usertoken`.
    pub tokens_file: Option<PathBuf>,
    /// Device token; overrides the file.
    pub device_token: Option<String>,
    /// User token; overrides the file.
    pub user_token: Option<String>,
    /// Overall request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct TokenFile {
    #[serde(default)]
    devicetoken: String,
    #[serde(default)]
    usertoken: String,
}

/// Resolves the bearer tokens. Flags win over the tokens file.
pub fn load_tokens(options: &ConnectOptions) -> CommandResult<AuthTokens> {
    let file = match &options.tokens_file {
        Some(path) => read_token_file(path)?,
        None => TokenFile::default(),
    };
    let device = options.device_token.clone().unwrap_or(file.devicetoken);
    let user = options.user_token.clone().unwrap_or(file.usertoken);
    if device.is_empty() && user.is_empty() {
        return Err("no tokens given: use --tokens, --device-token or --user-token".into());
    }
    Ok(AuthTokens::new(device, user))
}

fn read_token_file(path: &Path) -> CommandResult<TokenFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read tokens file {}: {e}", path.display()))?;
    let tokens = serde_json::from_str(&raw)
        .map_err(|e| format!("malformed tokens file {}: {e}", path.display()))?;
    debug!(path = %path.display(), "loaded tokens");
    Ok(tokens)
}

/// Builds a networked blob accessor.
pub fn connect(options: &ConnectOptions) -> CommandResult<BlobStorage<ReqwestClient>> {
    let tokens = load_tokens(options)?;
    let config =
        ClientConfig::new(Endpoints::from_base(&options.base_url)?).with_timeout(options.timeout);
    debug!(base_url = %options.base_url, timeout = ?options.timeout, "connecting");
    let transport = TransportClient::connect(tokens, config)?;
    Ok(BlobStorage::new(Arc::new(transport)))
}
