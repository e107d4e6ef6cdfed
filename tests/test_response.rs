use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use spillway::http::reply::{KeepAliveParams, build_reply};
use spillway::http::request::{Method, Request, RequestBuilder, Version};
use spillway::http::response::{Disposition, StatusCode};

fn request(keep_alive: bool, gzip: bool) -> Request {
    RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .keep_alive(keep_alive)
        .gzip(gzip)
        .build()
        .unwrap()
}

fn params(remaining: u32) -> KeepAliveParams {
    KeepAliveParams {
        timeout: Duration::from_secs(15),
        remaining,
    }
}

fn split(reply: &[u8]) -> (String, &[u8]) {
    let end = reply
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap();
    (
        String::from_utf8(reply[..end + 4].to_vec()).unwrap(),
        &reply[end + 4..],
    )
}

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::Created.as_u16(), 201);
    assert_eq!(StatusCode::NoContent.as_u16(), 204);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::Forbidden.reason_phrase(), "Forbidden");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
}

#[test]
fn test_disposition_constructors() {
    let ok = Disposition::ok("text/html", "<p>hi</p>");
    assert_eq!(ok.status, StatusCode::Ok);
    assert_eq!(ok.content_type, "text/html");
    assert_eq!(&ok.content[..], b"<p>hi</p>");

    assert_eq!(Disposition::forbidden().status, StatusCode::Forbidden);
    assert_eq!(Disposition::not_found().status, StatusCode::NotFound);
}

#[test]
fn test_reply_with_keep_alive() {
    let reply = build_reply(
        &request(true, false),
        &Disposition::ok("text/plain", "Hello"),
        params(42),
    )
    .unwrap();
    let (head, body) = split(&reply);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: text/plain\r\n"));
    assert!(head.contains("Content-Length: 5\r\n"));
    assert!(head.contains("Connection: Keep-Alive\r\n"));
    assert!(head.contains("Keep-Alive: timeout=15, max=42\r\n"));
    assert_eq!(body, b"Hello");
}

#[test]
fn test_reply_without_keep_alive() {
    let reply = build_reply(
        &request(false, false),
        &Disposition::not_found(),
        params(100),
    )
    .unwrap();
    let (head, body) = split(&reply);

    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    assert!(!head.contains("Keep-Alive:"));
    assert_eq!(body, b"404 Not Found");
}

#[test]
fn test_reply_echoes_protocol_version() {
    let mut req = request(false, false);
    req.version = Version::Http10;
    let reply = build_reply(&req, &Disposition::forbidden(), params(1)).unwrap();

    assert!(reply.starts_with(b"HTTP/1.0 403 Forbidden\r\n"));
}

#[test]
fn test_reply_gzip_body() {
    let content = "compress me ".repeat(50);
    let reply = build_reply(
        &request(false, true),
        &Disposition::ok("text/plain", content.clone()),
        params(1),
    )
    .unwrap();
    let (head, body) = split(&reply);

    assert!(head.contains("Content-Encoding: gzip\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", body.len())));

    let mut decoded = String::new();
    GzDecoder::new(body).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, content);
}

#[test]
fn test_reply_skips_gzip_for_empty_body() {
    let reply = build_reply(
        &request(false, true),
        &Disposition::ok("text/plain", ""),
        params(1),
    )
    .unwrap();
    let (head, body) = split(&reply);

    assert!(!head.contains("Content-Encoding"));
    assert!(head.contains("Content-Length: 0\r\n"));
    assert!(body.is_empty());
}

#[test]
fn test_head_reply_omits_body_but_keeps_length() {
    let mut req = request(true, false);
    req.method = Method::HEAD;
    let reply = build_reply(&req, &Disposition::ok("text/plain", "Hello"), params(3)).unwrap();
    let (head, body) = split(&reply);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Length: 5\r\n"));
    assert!(body.is_empty());
}

#[test]
fn test_head_reply_reports_gzipped_length() {
    let mut req = request(false, true);
    req.method = Method::HEAD;
    let content = "compress me ".repeat(50);
    let disposition = Disposition::ok("text/plain", content);

    let head_reply = build_reply(&req, &disposition, params(1)).unwrap();
    req.method = Method::GET;
    let get_reply = build_reply(&req, &disposition, params(1)).unwrap();

    let (head, body) = split(&head_reply);
    let (get_head, get_body) = split(&get_reply);
    assert!(body.is_empty());
    assert!(head.contains("Content-Encoding: gzip\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", get_body.len())));
    assert_eq!(head, get_head);
}
