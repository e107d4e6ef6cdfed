//! Response serialization
//!
//! Turns a [`Disposition`] plus the connection parameters negotiated by the
//! request into the bytes written back to the client.

use std::io::Write;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::http::request::{Method, Request};
use crate::http::response::Disposition;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("failed to gzip response body: {0}")]
    Compression(#[from] std::io::Error),
}

/// Connection parameters advertised in the `Keep-Alive` header
#[derive(Debug, Clone, Copy)]
pub struct KeepAliveParams {
    pub timeout: Duration,
    /// Cycles left on this connection, including the current one
    pub remaining: u32,
}

/// Serializes a reply to `request`.
///
/// The status line echoes the request's protocol version. The body is gzipped
/// when the client negotiated it and there is something to compress. A reply
/// to HEAD keeps the `Content-Length` of the body it leaves out.
pub fn build_reply(
    request: &Request,
    disposition: &Disposition,
    keep_alive: KeepAliveParams,
) -> Result<Vec<u8>, ReplyError> {
    let gzip = request.gzip && !disposition.content.is_empty();
    let content = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&disposition.content)?;
        encoder.finish()?
    } else {
        disposition.content.to_vec()
    };

    let mut headers: Vec<(&str, String)> = vec![
        ("Content-Type", disposition.content_type.clone()),
        ("Content-Length", content.len().to_string()),
    ];
    if gzip {
        headers.push(("Content-Encoding", "gzip".to_string()));
    }
    if request.keep_alive {
        headers.push(("Connection", "Keep-Alive".to_string()));
        headers.push((
            "Keep-Alive",
            format!(
                "timeout={}, max={}",
                keep_alive.timeout.as_secs(),
                keep_alive.remaining
            ),
        ));
    } else {
        headers.push(("Connection", "close".to_string()));
    }

    let mut buf = Vec::with_capacity(128 + content.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        request.version.as_str(),
        disposition.status.as_u16(),
        disposition.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    if request.method != Method::HEAD {
        buf.extend_from_slice(&content);
    }

    Ok(buf)
}
