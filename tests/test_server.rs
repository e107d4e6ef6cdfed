//! End-to-end tests over real TCP sockets

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use spillway::config::Config;
use spillway::handler::{EchoModule, ModuleManager, StatusModule};
use spillway::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn loopback() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
}

fn modules() -> Arc<ModuleManager> {
    Arc::new(
        ModuleManager::new()
            .register("/", Arc::new(StatusModule))
            .register("/echo", Arc::new(EchoModule)),
    )
}

async fn start(cfg: &Config) -> SocketAddr {
    let server = Server::launch_on(loopback(), cfg, modules()).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

#[tokio::test]
async fn test_serves_request_over_tcp() {
    let addr = start(&Config::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    let reply = String::from_utf8(reply).unwrap();

    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(reply.ends_with("spillway is running\n"));
}

#[tokio::test]
async fn test_bad_connection_does_not_stop_listener() {
    let addr = start(&Config::default()).await;

    let mut bad = TcpStream::connect(addr).await.unwrap();
    bad.write_all(b"NONSENSE\r\n\r\n").await.unwrap();
    let mut rest = Vec::new();
    let _ = bad.read_to_end(&mut rest).await;
    assert!(rest.is_empty());

    let mut good = TcpStream::connect(addr).await.unwrap();
    good.write_all(b"POST /echo HTTP/1.1\r\nConnection: close\r\nContent-Length: 4\r\n\r\nping")
        .await
        .unwrap();
    let mut reply = Vec::new();
    good.read_to_end(&mut reply).await.unwrap();
    assert!(reply.ends_with(b"ping"));
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let cfg = Config::default();
    let first = Server::launch_on(loopback(), &cfg, modules()).await.unwrap();
    let taken = first.local_addr().unwrap();

    assert!(Server::launch_on(taken, &cfg, modules()).await.is_err());
}
