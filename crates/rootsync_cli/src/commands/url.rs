//! Signed URL command implementation.

use super::CommandResult;
use rootsync_client::{BlobStorage, HttpClient};
use rootsync_protocol::ContentHash;
use std::io::Write;

/// Kind of URL to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UrlKind {
    /// Download URL.
    Get,
    /// Upload URL.
    Put,
}

/// Requests a signed URL and prints it.
pub fn run<C: HttpClient>(
    storage: &BlobStorage<C>,
    kind: UrlKind,
    hash: &ContentHash,
    out: &mut dyn Write,
) -> CommandResult {
    match kind {
        UrlKind::Get => {
            let url = storage.get_url(hash)?;
            writeln!(out, "{url}")?;
        }
        UrlKind::Put => {
            let (url, max) = storage.put_url(hash)?;
            writeln!(out, "{url}")?;
            if max > 0 {
                writeln!(out, "max upload size: {max} bytes")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootsync_client::{
        ClientConfig, Endpoints, LoopbackClient, LoopbackRequest, LoopbackResponse,
        LoopbackServer, TransportClient,
    };
    use rootsync_protocol::{AuthTokens, HeaderSet};
    use std::sync::Arc;

    struct Grants;

    impl LoopbackServer for Grants {
        fn handle(&self, request: LoopbackRequest) -> LoopbackResponse {
            let upload = request.path.ends_with("/uploads");
            let body = serde_json::json!({
                "expires": "2030-01-01T00:00:00Z",
                "method": if upload { "PUT" } else { "GET" },
                "relative_path": "abc",
                "url": format!("http://blobs.test/signed/abc?upload={upload}"),
                "maxuploadsize_bytes": if upload { 1024 } else { 0 },
            });
            LoopbackResponse {
                status: 200,
                headers: HeaderSet::new(),
                body: body.to_string().into_bytes(),
            }
        }
    }

    fn storage() -> BlobStorage<LoopbackClient<Grants>> {
        let config = ClientConfig::new(Endpoints::from_base("http://blobs.test/").unwrap());
        let transport =
            TransportClient::new(AuthTokens::new("d", "u"), config, LoopbackClient::new(Grants));
        BlobStorage::new(Arc::new(transport))
    }

    #[test]
    fn prints_download_url() {
        let mut out = Vec::new();
        run(&storage(), UrlKind::Get, &"abc".into(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "http://blobs.test/signed/abc?upload=false\n"
        );
    }

    #[test]
    fn prints_upload_url_with_limit() {
        let mut out = Vec::new();
        run(&storage(), UrlKind::Put, &"abc".into(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("http://blobs.test/signed/abc?upload=true\n"));
        assert!(text.contains("max upload size: 1024 bytes"));
    }
}
