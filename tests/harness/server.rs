//! WebSocket echo server for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use hybi::{Config, Connection, Server};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Echo server bound to an ephemeral port.
pub struct TestServer {
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Spawn an echo server with the default configuration.
    pub async fn spawn() -> (Self, SocketAddr) {
        Self::spawn_with_config(Config::default()).await
    }

    /// Spawn an echo server with a custom configuration.
    pub async fn spawn_with_config(config: Config) -> (Self, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Arc::new(Server::new(config, echo));
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let server = Arc::clone(&server);
                tokio::spawn(async move {
                    let _ = server.accept(stream, false).await;
                });
            }
        });

        (Self { handle }, addr)
    }

    /// Stop accepting connections.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

async fn echo(conn: Connection<BufReader<TcpStream>>) {
    while let Ok(Some(message)) = conn.recv_message().await {
        if conn.send(&message).await.is_err() {
            break;
        }
    }
    let _ = conn.close().await;
}
