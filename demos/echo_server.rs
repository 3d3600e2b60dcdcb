//! Simple WebSocket echo server.
//!
//! Run with: cargo run --example echo_server
//! Then connect with any WebSocket client to ws://127.0.0.1:9001/

use std::error::Error;
use std::sync::Arc;

use hybi::{Config, Connection, HandshakeRequest, Message, Server};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

const ADDR: &str = "127.0.0.1:9001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::init_with_level(log::Level::Debug)?;

    let server = Arc::new(Server::new(Config::default(), handle_connection).with_handshake(select_protocol));

    let listener = TcpListener::bind(ADDR).await?;
    log::info!("WebSocket echo server listening on {ADDR}");

    loop {
        let (stream, addr) = listener.accept().await?;
        log::info!("New connection from {addr}");

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = server.accept(stream, false).await {
                log::warn!("Connection from {addr} failed: {e}");
            }
        });
    }
}

/// Keep "echo" if the client offered it, otherwise speak no subprotocol.
fn select_protocol(config: &mut Config, request: &HandshakeRequest) -> Result<(), String> {
    let offered = std::mem::take(&mut config.protocols);
    config.protocols = offered.into_iter().filter(|p| p == "echo").collect();
    log::debug!(
        "Handshake for {} from origin {:?}, protocol {:?}",
        request.path,
        request.header("origin"),
        config.protocol()
    );
    Ok(())
}

async fn handle_connection(conn: Connection<BufReader<TcpStream>>) {
    loop {
        match conn.recv_message().await {
            Ok(Some(Message::Text(text))) => {
                log::info!("Received text: {text}");
                if conn.send_text(&text).await.is_err() {
                    break;
                }
            }
            Ok(Some(message)) => {
                log::info!("Received binary: {} bytes", message.as_bytes().len());
                if conn.send_binary(message.as_bytes()).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                log::info!("Peer closed the connection");
                break;
            }
            Err(e) => {
                log::warn!("Read failed: {e}");
                break;
            }
        }
    }

    if let Err(e) = conn.close().await {
        log::debug!("Close failed: {e}");
    }
}
