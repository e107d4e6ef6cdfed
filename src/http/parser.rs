use crate::http::request::{Method, Request, Version};
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on header lines in one request
pub const MAX_HEADERS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The header terminator has not arrived yet
    #[error("header terminator not found yet")]
    Incomplete,
    #[error("invalid request line or header syntax")]
    InvalidRequest,
    #[error("unsupported request method")]
    InvalidMethod,
    #[error("unsupported protocol version")]
    InvalidVersion,
    #[error("invalid header value")]
    InvalidHeader,
    #[error("more than {} header lines", MAX_HEADERS)]
    TooManyHeaders,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("Transfer-Encoding is not supported")]
    UnsupportedTransferEncoding,
}

/// Attempts to extract a request header from the start of `buf`.
///
/// Holds no state between calls: the connection calls it on the whole staged
/// buffer after every delivery until it stops returning
/// [`ParseError::Incomplete`]. Bytes following the header terminator are left
/// for the caller and counted against `content_length`.
pub fn parse_header(buf: &[u8]) -> Result<Request, ParseError> {
    let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut raw = httparse::Request::new(&mut slots);

    let header_size = match raw.parse(buf) {
        Ok(httparse::Status::Complete(n)) => n,
        Ok(httparse::Status::Partial) => return Err(ParseError::Incomplete),
        Err(httparse::Error::TooManyHeaders) => return Err(ParseError::TooManyHeaders),
        Err(httparse::Error::Version) => return Err(ParseError::InvalidVersion),
        Err(_) => return Err(ParseError::InvalidRequest),
    };

    let method = raw
        .method
        .and_then(Method::from_str)
        .ok_or(ParseError::InvalidMethod)?;
    let path = raw.path.ok_or(ParseError::InvalidRequest)?.to_string();
    let version = raw
        .version
        .and_then(Version::from_minor)
        .ok_or(ParseError::InvalidVersion)?;

    let mut headers: HashMap<String, String> = HashMap::new();
    let mut content_length: Option<usize> = None;

    for header in raw.headers.iter() {
        let name = header.name.to_ascii_lowercase();
        let value = std::str::from_utf8(header.value)
            .map_err(|_| ParseError::InvalidHeader)?
            .trim();

        match name.as_str() {
            "content-length" => {
                let length = value
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidContentLength)?;
                // Repeated values are tolerated only when they agree
                if content_length.is_some_and(|previous| previous != length) {
                    return Err(ParseError::InvalidContentLength);
                }
                content_length = Some(length);
            }
            "transfer-encoding" => return Err(ParseError::UnsupportedTransferEncoding),
            _ => {}
        }

        headers
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let keep_alive = negotiate_keep_alive(version, headers.get("connection").map(String::as_str));
    let gzip = headers
        .get("accept-encoding")
        .is_some_and(|value| accepts_gzip(value));

    Ok(Request {
        method,
        path,
        version,
        header_size,
        content_length: content_length.unwrap_or(0),
        keep_alive,
        gzip,
        headers,
    })
}

/// HTTP/1.1 persists unless told to close; HTTP/1.0 closes unless asked to persist.
fn negotiate_keep_alive(version: Version, connection: Option<&str>) -> bool {
    let has_token = |token: &str| {
        connection.is_some_and(|value| {
            value
                .split(',')
                .any(|t| t.trim().eq_ignore_ascii_case(token))
        })
    };

    match version {
        Version::Http11 => !has_token("close"),
        Version::Http10 => has_token("keep-alive"),
    }
}

fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding.split(',').any(|entry| {
        let mut parts = entry.split(';');
        let coding = parts.next().unwrap_or("").trim();
        if !coding.eq_ignore_ascii_case("gzip") {
            return false;
        }
        // "gzip;q=0" explicitly refuses the coding
        !parts.any(|param| {
            param
                .trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        })
    })
}
