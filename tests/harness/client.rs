//! Minimal WebSocket client for integration testing.

use std::net::SocketAddr;

use bytes::BytesMut;
use hybi::protocol::{FrameHeader, apply_mask};
use hybi::{Config, Connection, Message, OpCode, compute_accept_key};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

/// Encode one client frame masked with a fixed key.
pub fn masked_frame(fin: bool, opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let key = [0xa1, 0xb2, 0xc3, 0xd4];
    let header = FrameHeader::new(fin, opcode, payload.len() as u64)
        .with_masking_key(&key)
        .unwrap();
    let mut buf = BytesMut::new();
    header.encode(&mut buf);
    let start = buf.len();
    buf.extend_from_slice(payload);
    apply_mask(&mut buf[start..], key);
    buf.to_vec()
}

/// Read an HTTP response head up to and including the blank line.
pub async fn read_response_head<R: AsyncBufRead + Unpin>(src: &mut R) -> String {
    let mut head = Vec::new();
    loop {
        let n = src.read_until(b'\n', &mut head).await.unwrap();
        if n == 0 || head.ends_with(b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8(head).unwrap()
}

/// Client connection to a [`TestServer`](super::TestServer).
pub struct TestClient {
    conn: Connection<BufReader<TcpStream>>,
}

impl TestClient {
    /// Connect and complete the opening handshake.
    pub async fn connect(addr: SocketAddr) -> hybi::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let mut stream = BufReader::new(stream);

        let request = format!(
            "GET /echo HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {KEY}\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        );
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        let head = read_response_head(&mut stream).await;
        assert!(head.starts_with("HTTP/1.1 101"), "unexpected response: {head}");
        assert!(head.contains(&format!("Sec-WebSocket-Accept: {}", compute_accept_key(KEY))));

        Ok(Self {
            conn: Connection::client(stream, Config::default()),
        })
    }

    pub async fn send_text(&self, text: &str) -> hybi::Result<()> {
        self.conn.send_text(text).await
    }

    pub async fn send_binary(&self, data: &[u8]) -> hybi::Result<()> {
        self.conn.send_binary(data).await
    }

    pub async fn recv(&self) -> hybi::Result<Option<Message>> {
        self.conn.recv_message().await
    }

    pub async fn recv_text(&self) -> hybi::Result<Option<String>> {
        Ok(self.conn.recv_message().await?.and_then(Message::into_text))
    }

    pub async fn close(&self) -> hybi::Result<()> {
        self.conn.close().await
    }

    pub fn connection(&self) -> &Connection<BufReader<TcpStream>> {
        &self.conn
    }
}
