//! Spillway - HTTP/1.x request-framing server
//!
//! Reassembles requests from streamed socket reads under strict size limits,
//! spilling large bodies to disk, and serves persistent connections.

pub mod config;
pub mod handler;
pub mod http;
pub mod server;
pub mod storage;
