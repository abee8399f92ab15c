//! Debug dumps of inbound webhook requests.
//!
//! Each dumped request lands in its own file so concurrent requests never
//! interleave. The format is the HTTP/1.1 request as received: request line,
//! headers, blank line, body.

use std::path::{Path, PathBuf};

use axum::http::{HeaderMap, Method, Uri};
use uuid::Uuid;

/// Writes one request to a fresh `jira-<uuid>.dump` file in `dir`.
///
/// Returns the path of the written file.
pub async fn dump_request(
    dir: &Path,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> std::io::Result<PathBuf> {
    let mut dump = format!("{method} {uri} HTTP/1.1\r\n").into_bytes();
    for (name, value) in headers {
        dump.extend_from_slice(name.as_str().as_bytes());
        dump.extend_from_slice(b": ");
        dump.extend_from_slice(value.as_bytes());
        dump.extend_from_slice(b"\r\n");
    }
    dump.extend_from_slice(b"\r\n");
    dump.extend_from_slice(body);

    let path = dir.join(format!("jira-{}.dump", Uuid::new_v4()));
    tokio::fs::write(&path, dump).await?;
    Ok(path)
}
