//! Request handling
//!
//! A [`RequestHandler`] turns a fully received request into a [`Verdict`].
//! One handler instance is injected when the server is built and shared by
//! every connection, so implementations must not rely on per-connection state.

pub mod modules;

use async_trait::async_trait;

use crate::http::request::{Body, Request};
use crate::http::response::Disposition;

pub use modules::{EchoModule, ModuleManager, StatusModule};

/// Outcome of handling one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Send this disposition back to the client
    Accepted(Disposition),
    /// Close the connection without a response
    Rejected,
}

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn process(&self, request: &Request, body: &Body) -> Verdict;
}
