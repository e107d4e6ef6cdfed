use std::cmp::Ordering;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::config::{Config, KeepAliveConfig, LimitsConfig};
use crate::handler::{RequestHandler, Verdict};
use crate::http::parser::{ParseError, parse_header};
use crate::http::reply::{KeepAliveParams, ReplyError, build_reply};
use crate::http::request::{Body, Request};
use crate::storage::{Spillover, TemporaryStore};

/// Everything a connection needs that outlives it, shared by all connections.
pub struct ConnectionContext {
    pub limits: LimitsConfig,
    pub keep_alive: KeepAliveConfig,
    pub store: TemporaryStore,
    pub handler: Arc<dyn RequestHandler>,
}

impl ConnectionContext {
    pub fn new(config: &Config, handler: Arc<dyn RequestHandler>) -> Self {
        Self {
            limits: config.limits.clone(),
            keep_alive: config.keep_alive.clone(),
            store: TemporaryStore::new(config.server.temporary_directory.clone()),
            handler,
        }
    }
}

/// Why a connection was torn down before finishing normally.
///
/// None of these produce a response: the client just sees the connection close.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("connection idle for {0:?}")]
    Timeout(Duration),
    #[error("request too large: {received} bytes received, limit is {limit}")]
    RequestTooLarge { received: usize, limit: usize },
    #[error("staged {staged} bytes without a complete header (limit {limit})")]
    HeaderTooLarge { staged: usize, limit: usize },
    #[error("malformed request header: {0}")]
    Malformed(#[from] ParseError),
    #[error("received too many bytes: {received} > {expected}")]
    ExcessBytes { received: usize, expected: usize },
    #[error("spillover file failure: {0}")]
    Spillover(#[source] io::Error),
    #[error("request rejected by the handler")]
    Rejected,
    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl ConnectionError {
    /// Failures on our side rather than client misbehavior.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, ConnectionError::Spillover(_) | ConnectionError::Reply(_))
    }
}

pub enum ConnectionState {
    /// Waiting for the next delivery of request bytes
    Reading,
    /// The full request has arrived
    Dispatching(Request, Body),
    Writing(Vec<u8>, bool), // bool = keep_alive?
    Closed,
}

/// One client connection, from the first byte to termination.
///
/// Request bytes are staged in memory until the header has been parsed. A
/// body that pushes the staging buffer past its threshold moves to a
/// spillover file for the rest of the cycle; a headerless buffer that does
/// the same is dropped as abuse.
pub struct Connection<S> {
    stream: S,
    ctx: Arc<ConnectionContext>,
    chunk: Box<[u8]>,
    staging: BytesMut,
    spillover: Option<Spillover>,
    bytes_received: usize,
    /// Present from header acquisition until dispatch
    request: Option<Request>,
    keep_alive_remaining: u32,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, ctx: Arc<ConnectionContext>) -> Self {
        let chunk = vec![0u8; ctx.limits.read_buffer_size].into_boxed_slice();
        let staging = BytesMut::with_capacity(ctx.limits.max_staging_size.min(chunk.len() * 2));
        let keep_alive_remaining = ctx.keep_alive.max;

        Self {
            stream,
            ctx,
            chunk,
            staging,
            spillover: None,
            bytes_received: 0,
            request: None,
            keep_alive_remaining,
            state: ConnectionState::Reading,
        }
    }

    /// Serve requests until the connection ends.
    ///
    /// `Ok` covers the orderly endings: the peer closed, keep-alive was not
    /// negotiated, or the keep-alive budget ran out. Spillover storage is
    /// released on every path.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        self.initialise();
        let result = self.drive().await;
        self.terminate().await;
        result
    }

    async fn drive(&mut self) -> Result<(), ConnectionError> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    let n = self.read().await?;
                    if n == 0 {
                        debug!(bytes_received = self.bytes_received, "Peer closed the connection");
                        return Ok(());
                    }
                    self.state = self.on_bytes_delivered(n).await?;
                }

                ConnectionState::Dispatching(request, body) => {
                    let reply = self.dispatch(&request, &body).await?;
                    self.state = ConnectionState::Writing(reply, request.keep_alive);
                }

                ConnectionState::Writing(reply, keep_alive) => {
                    self.write(&reply).await?;
                    self.state = self.on_write_complete(keep_alive).await;
                }

                ConnectionState::Closed => return Ok(()),
            }
        }
    }

    async fn read(&mut self) -> Result<usize, ConnectionError> {
        let limit = self.ctx.limits.read_timeout();
        let read = self.stream.read(&mut self.chunk[..]);
        match limit {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| ConnectionError::Timeout(limit))?
                .map_err(ConnectionError::Io),
            None => Ok(read.await?),
        }
    }

    /// Write and flush one reply, bounded by the write timeout.
    async fn write(&mut self, reply: &[u8]) -> Result<(), ConnectionError> {
        let limit = self.ctx.limits.write_timeout();
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(reply).await?;
            stream.flush().await
        };
        match limit {
            Some(limit) => timeout(limit, write)
                .await
                .map_err(|_| ConnectionError::Timeout(limit))?
                .map_err(ConnectionError::Io),
            None => Ok(write.await?),
        }
    }

    /// Account for `n` fresh bytes sitting at the front of the read chunk.
    async fn on_bytes_delivered(&mut self, n: usize) -> Result<ConnectionState, ConnectionError> {
        let ctx = Arc::clone(&self.ctx);
        self.bytes_received += n;
        trace!(bytes = n, total = self.bytes_received, "Read event");

        if self.bytes_received > ctx.limits.max_request_size {
            return Err(ConnectionError::RequestTooLarge {
                received: self.bytes_received,
                limit: ctx.limits.max_request_size,
            });
        }

        if self.spillover.is_none() {
            self.staging.extend_from_slice(&self.chunk[..n]);

            if self.request.is_none() {
                match parse_header(&self.staging) {
                    Ok(request) => {
                        debug!(
                            method = ?request.method,
                            path = %request.path,
                            header_size = request.header_size,
                            content_length = request.content_length,
                            "Retrieved the full HTTP header"
                        );
                        self.request = Some(request);
                    }
                    Err(ParseError::Incomplete) => trace!("No header terminator yet"),
                    Err(e) => return Err(e.into()),
                }
            }

            if self.staging.len() > ctx.limits.max_staging_size {
                if self.request.is_none() {
                    return Err(ConnectionError::HeaderTooLarge {
                        staged: self.staging.len(),
                        limit: ctx.limits.max_staging_size,
                    });
                }
                self.spill().await?;
            }
        } else if let Some(sink) = self.spillover.as_mut() {
            sink.append(&self.chunk[..n])
                .await
                .map_err(ConnectionError::Spillover)?;
        }

        let Some(request) = self.request.take() else {
            return Ok(ConnectionState::Reading);
        };
        let expected = request.expected_size();

        match self.bytes_received.cmp(&expected) {
            Ordering::Greater => Err(ConnectionError::ExcessBytes {
                received: self.bytes_received,
                expected,
            }),
            Ordering::Less => {
                self.request = Some(request);
                Ok(ConnectionState::Reading)
            }
            Ordering::Equal => {
                let body = self.assemble_body(&request).await?;
                Ok(ConnectionState::Dispatching(request, body))
            }
        }
    }

    /// Move everything staged so far into a fresh spillover file.
    async fn spill(&mut self) -> Result<(), ConnectionError> {
        let sink = self
            .ctx
            .store
            .allocate()
            .await
            .map_err(ConnectionError::Spillover)?;

        // Stored before the first write: terminate() releases it either way
        let sink = self.spillover.insert(sink);
        sink.append(&self.staging)
            .await
            .map_err(ConnectionError::Spillover)?;
        debug!(
            path = %sink.path().display(),
            written = sink.written(),
            "Spilled staged request to temporary file"
        );
        self.staging.clear();
        Ok(())
    }

    async fn assemble_body(&mut self, request: &Request) -> Result<Body, ConnectionError> {
        if request.content_length == 0 {
            return Ok(Body::Empty);
        }

        match self.spillover.as_mut() {
            Some(sink) => {
                sink.flush().await.map_err(ConnectionError::Spillover)?;
                Ok(Body::Spooled {
                    path: sink.path().to_path_buf(),
                    offset: request.header_size as u64,
                    len: request.content_length as u64,
                })
            }
            None => Ok(Body::Memory(
                self.staging.split_off(request.header_size).freeze(),
            )),
        }
    }

    async fn dispatch(&mut self, request: &Request, body: &Body) -> Result<Vec<u8>, ConnectionError> {
        debug!(
            method = ?request.method,
            path = %request.path,
            body = body.len(),
            "Dispatching request"
        );

        match self.ctx.handler.process(request, body).await {
            Verdict::Rejected => Err(ConnectionError::Rejected),
            Verdict::Accepted(disposition) => {
                let params = KeepAliveParams {
                    timeout: Duration::from_secs(self.ctx.keep_alive.timeout),
                    remaining: self.keep_alive_remaining,
                };
                let reply = build_reply(request, &disposition, params)?;
                debug!(
                    status = disposition.status.as_u16(),
                    bytes = reply.len(),
                    "Serving reply"
                );
                Ok(reply)
            }
        }
    }

    async fn on_write_complete(&mut self, keep_alive: bool) -> ConnectionState {
        if !keep_alive {
            debug!("No keep-alive");
            return ConnectionState::Closed;
        }

        self.keep_alive_remaining = self.keep_alive_remaining.saturating_sub(1);
        if self.keep_alive_remaining == 0 {
            debug!("Keep-alive budget exhausted");
            return ConnectionState::Closed;
        }

        debug!(remaining = self.keep_alive_remaining, "Reinitialising for the next request");
        self.release_spillover().await;
        self.initialise();
        ConnectionState::Reading
    }

    fn initialise(&mut self) {
        self.staging.clear();
        self.bytes_received = 0;
        self.request = None;
    }

    async fn release_spillover(&mut self) {
        if let Some(sink) = self.spillover.take() {
            let path = sink.path().to_path_buf();
            if let Err(e) = self.ctx.store.release(sink).await {
                warn!(path = %path.display(), error = %e, "Failed to release spillover file");
            }
        }
    }

    async fn terminate(&mut self) {
        debug!("Terminating");
        self.release_spillover().await;
        // The peer may already be gone
        let _ = self.stream.shutdown().await;
        self.state = ConnectionState::Closed;
    }
}
