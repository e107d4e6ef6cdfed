//! Module registry and built-in modules
//!
//! The [`ModuleManager`] routes each request to the module registered under
//! the longest matching path prefix.

use std::io::SeekFrom;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::handler::{RequestHandler, Verdict};
use crate::http::request::{Body, Method, Request};
use crate::http::response::{Disposition, StatusCode};

/// Routes requests to modules by path prefix.
#[derive(Default)]
pub struct ModuleManager {
    modules: Vec<(String, Arc<dyn RequestHandler>)>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` for every path under `prefix`.
    pub fn register(mut self, prefix: impl Into<String>, module: Arc<dyn RequestHandler>) -> Self {
        self.modules.push((prefix.into(), module));
        self
    }

    fn resolve(&self, path: &str) -> Option<&Arc<dyn RequestHandler>> {
        self.modules
            .iter()
            .filter(|(prefix, _)| prefix_matches(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, module)| module)
    }
}

/// `/echo` matches `/echo` and `/echo/x`, but not `/echoes`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

#[async_trait]
impl RequestHandler for ModuleManager {
    async fn process(&self, request: &Request, body: &Body) -> Verdict {
        let path = strip_query(&request.path);

        if path.split('/').any(|segment| segment == "..") {
            tracing::warn!(path = %request.path, "Refusing path with parent segment");
            return Verdict::Accepted(Disposition::forbidden());
        }

        match self.resolve(path) {
            Some(module) => module.process(request, body).await,
            None => {
                tracing::debug!(path = %request.path, "No module registered for path");
                Verdict::Accepted(Disposition::not_found())
            }
        }
    }
}

/// Plain-text liveness page.
pub struct StatusModule;

#[async_trait]
impl RequestHandler for StatusModule {
    async fn process(&self, request: &Request, _body: &Body) -> Verdict {
        match request.method {
            Method::GET | Method::HEAD => {
                Verdict::Accepted(Disposition::ok("text/plain", "spillway is running\n"))
            }
            _ => Verdict::Accepted(Disposition::new(
                StatusCode::MethodNotAllowed,
                "text/plain",
                "405 Method Not Allowed",
            )),
        }
    }
}

/// Returns the request body unchanged, reading spooled bodies back from disk.
pub struct EchoModule;

impl EchoModule {
    async fn read_body(body: &Body) -> std::io::Result<Bytes> {
        match body {
            Body::Empty => Ok(Bytes::new()),
            Body::Memory(bytes) => Ok(bytes.clone()),
            Body::Spooled { path, offset, len } => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(*offset)).await?;
                let mut content = vec![0u8; *len as usize];
                file.read_exact(&mut content).await?;
                Ok(Bytes::from(content))
            }
        }
    }
}

#[async_trait]
impl RequestHandler for EchoModule {
    async fn process(&self, request: &Request, body: &Body) -> Verdict {
        match Self::read_body(body).await {
            Ok(content) => {
                let content_type = request
                    .header("Content-Type")
                    .unwrap_or("application/octet-stream");
                Verdict::Accepted(Disposition::ok(content_type, content))
            }
            Err(e) => {
                tracing::error!(error = %e, path = %request.path, "Failed to read request body");
                Verdict::Rejected
            }
        }
    }
}
