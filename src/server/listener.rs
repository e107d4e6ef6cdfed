use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::Config;
use crate::handler::RequestHandler;
use crate::http::connection::{Connection, ConnectionContext};

/// A bound listener ready to accept connections.
pub struct Server {
    listener: TcpListener,
    ctx: Arc<ConnectionContext>,
}

impl Server {
    /// Bind and listen on `cfg.server.port` on all IPv4 interfaces.
    pub async fn launch(cfg: &Config, handler: Arc<dyn RequestHandler>) -> anyhow::Result<Self> {
        Self::launch_on(
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, cfg.server.port)),
            cfg,
            handler,
        )
        .await
    }

    pub async fn launch_on(
        addr: SocketAddr,
        cfg: &Config,
        handler: Arc<dyn RequestHandler>,
    ) -> anyhow::Result<Self> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .context("Failed to create listening socket")?;
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .with_context(|| format!("Failed to bind {}", addr))?;
        let listener = socket
            .listen(cfg.server.backlog)
            .with_context(|| format!("Failed to listen on {}", addr))?;

        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            ctx: Arc::new(ConnectionContext::new(cfg, handler)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task per connection.
    ///
    /// Accept failures are logged and accepting continues.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Accept error");
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let ctx = Arc::clone(&self.ctx);
            tokio::spawn(
                async move {
                    let conn = Connection::new(socket, ctx);
                    match conn.run().await {
                        Ok(()) => {}
                        Err(e) if e.is_server_fault() => error!(error = %e, "Connection failed"),
                        Err(e) => warn!(error = %e, "Connection terminated"),
                    }
                }
                .instrument(info_span!("connection", %peer)),
            );
        }
    }
}
