//! WebSocket opening handshake, server side (RFC 6455 Section 4.2).
//!
//! The negotiator works on an already-parsed [`HandshakeRequest`]. Requests
//! can come from raw bytes ([`HandshakeRequest::parse`]), straight off a
//! transport ([`HandshakeRequest::read_from`]), or from an HTTP stack that
//! has done the parsing already ([`HandshakeRequest::from_http`]).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use sha1::{Digest, Sha1};
use url::Url;

use crate::config::{Config, PROTOCOL_VERSION, SUPPORTED_VERSION};
use crate::error::HandshakeError;

#[cfg(feature = "async-tokio")]
use crate::config::Limits;
#[cfg(feature = "async-tokio")]
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Headers that may appear at most once in an upgrade request.
const SECURITY_HEADERS: [&str; 5] = [
    "host",
    "upgrade",
    "connection",
    "sec-websocket-key",
    "sec-websocket-version",
];

/// Headers owned by the protocol; never copied from `Config::headers`.
const RESERVED_RESPONSE_HEADERS: [&str; 8] = [
    "host",
    "upgrade",
    "connection",
    "sec-websocket-key",
    "sec-websocket-origin",
    "sec-websocket-version",
    "sec-websocket-protocol",
    "sec-websocket-accept",
];

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use hybi::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

fn check_duplicates(headers: &HeaderMap) -> Result<(), HandshakeError> {
    for name in SECURITY_HEADERS {
        if headers.get_all(name).iter().count() > 1 {
            return Err(HandshakeError::Malformed(format!("duplicate header: {name}")));
        }
    }
    Ok(())
}

fn validate_header_value(header_name: &str, value: &str) -> Result<(), HandshakeError> {
    if value.contains('\r') || value.contains('\n') {
        return Err(HandshakeError::Malformed(format!(
            "{header_name} contains CR or LF characters"
        )));
    }
    Ok(())
}

/// The parts of an HTTP request the negotiator looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeRequest {
    /// Request method.
    pub method: Method,
    /// Request target as sent (path plus optional query).
    pub path: String,
    /// Host the request was addressed to.
    pub host: String,
    /// All request headers.
    pub headers: HeaderMap,
    /// Whether the request arrived over TLS (selects `wss` over `ws`).
    pub tls: bool,
}

impl HandshakeRequest {
    /// Build a request descriptor by hand.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            host: host.into(),
            headers: HeaderMap::new(),
            tls: false,
        }
    }

    /// Append a header.
    ///
    /// # Errors
    ///
    /// Returns `HandshakeError::Malformed` if the name or value is not valid
    /// HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, HandshakeError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HandshakeError::Malformed(format!("invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| HandshakeError::Malformed(format!("invalid value for {name}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Mark the request as received over TLS.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// First value of `name` (case-insensitive), if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse a raw HTTP/1.x request head.
    ///
    /// Only the syntax is checked here; upgrade semantics are left to
    /// [`ServerHandshaker::read_handshake`] so that each failure maps onto
    /// the right status code.
    ///
    /// # Errors
    ///
    /// Returns `HandshakeError::Malformed` if:
    /// - The data is not valid UTF-8.
    /// - The request line is malformed or missing.
    /// - A header line has no colon or an invalid name or value.
    /// - A security-critical header is duplicated.
    pub fn parse(data: &[u8]) -> Result<Self, HandshakeError> {
        let text = std::str::from_utf8(data)
            .map_err(|_| HandshakeError::Malformed("invalid UTF-8".into()))?;

        let mut lines = text.lines();

        // Parse request line: "GET /path HTTP/1.1"
        let request_line = lines
            .next()
            .ok_or_else(|| HandshakeError::Malformed("empty request".into()))?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 || !parts[2].starts_with("HTTP/") {
            return Err(HandshakeError::Malformed(format!(
                "invalid request line: {request_line:?}"
            )));
        }

        let method = Method::from_bytes(parts[0].as_bytes())
            .map_err(|_| HandshakeError::Malformed(format!("invalid method: {}", parts[0])))?;

        let mut request = Self::new(method, parts[1], "");
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| HandshakeError::Malformed(format!("invalid header line: {line:?}")))?;
            request = request.with_header(name.trim(), value.trim())?;
        }

        check_duplicates(&request.headers)?;
        request.host = request.header("host").unwrap_or_default().to_string();
        Ok(request)
    }

    /// Read a request head from `src` and parse it.
    ///
    /// Stops at the first blank line; anything after it stays buffered in
    /// `src` and belongs to the WebSocket stream.
    ///
    /// # Errors
    ///
    /// - `HandshakeError::TooLarge` if the head exceeds `limits.max_handshake_size`
    /// - `HandshakeError::Malformed` if the stream ends first or parsing fails
    /// - `Error::Io` on transport failure
    #[cfg(feature = "async-tokio")]
    pub async fn read_from<R>(src: &mut R, limits: &Limits) -> crate::Result<Self>
    where
        R: AsyncBufRead + Unpin,
    {
        let max = limits.max_handshake_size;
        let mut limited = src.take(max as u64 + 1);
        let mut head = Vec::with_capacity(512);

        loop {
            let n = limited.read_until(b'\n', &mut head).await?;
            limits.check_handshake_size(head.len())?;
            if n == 0 {
                return Err(HandshakeError::Malformed("connection closed during handshake".into()).into());
            }
            if head.ends_with(b"\r\n\r\n") || head.ends_with(b"\n\n") {
                break;
            }
        }

        Ok(Self::parse(&head)?)
    }

    /// Build a request descriptor from an HTTP stack's request parts.
    #[must_use]
    pub fn from_http(parts: &http::request::Parts, tls: bool) -> Self {
        let host = parts
            .headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_default();
        let path = parts
            .uri
            .path_and_query()
            .map_or("/", http::uri::PathAndQuery::as_str)
            .to_string();

        Self {
            method: parts.method.clone(),
            path,
            host,
            headers: parts.headers.clone(),
            tls,
        }
    }
}

/// Server-side negotiator for one upgrade request.
///
/// [`read_handshake`](Self::read_handshake) validates the request and fills
/// in the configuration; the caller may then adjust `config_mut()` (for
/// example to pick a subprotocol) before [`accept_handshake`](Self::accept_handshake)
/// writes the 101 response.
#[derive(Debug, Clone)]
pub struct ServerHandshaker {
    config: Config,
    accept: Option<String>,
}

impl ServerHandshaker {
    /// Create a negotiator seeded with `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config, accept: None }
    }

    /// Validate an upgrade request.
    ///
    /// On success the configuration carries the endpoint location and the
    /// client's subprotocol candidates, and the accept token is computed.
    ///
    /// # Errors
    ///
    /// - `BadMethod` (405) if the method is not `GET`
    /// - `NotWebSocket` (400) if `Upgrade`/`Connection` do not ask for an upgrade
    /// - `MissingKey` (400) if `Sec-WebSocket-Key` is absent or empty
    /// - `BadVersion` (400) unless `Sec-WebSocket-Version` is "13"
    /// - `BadLocation` (400) if no valid URL can be built from host and path
    /// - `Malformed` (400) if a security-critical header is duplicated
    pub fn read_handshake(&mut self, request: &HandshakeRequest) -> Result<StatusCode, HandshakeError> {
        self.config.version = PROTOCOL_VERSION;

        if request.method != Method::GET {
            return Err(HandshakeError::BadMethod(request.method.to_string()));
        }

        check_duplicates(&request.headers)?;

        let upgrade_ok = request
            .header("upgrade")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));
        let connection_ok = request.header("connection").is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });
        if !upgrade_ok || !connection_ok {
            return Err(HandshakeError::NotWebSocket);
        }

        let key = request
            .header("sec-websocket-key")
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(HandshakeError::MissingKey)?;

        let version = request.header("sec-websocket-version").unwrap_or_default().trim();
        if version != SUPPORTED_VERSION {
            return Err(HandshakeError::BadVersion(version.to_string()));
        }

        let scheme = if request.tls { "wss" } else { "ws" };
        let location = format!("{scheme}://{}{}", request.host, request.path);
        if request.host.is_empty() {
            return Err(HandshakeError::BadLocation(location));
        }
        let location = Url::parse(&location).map_err(|e| HandshakeError::BadLocation(format!("{location}: {e}")))?;
        self.config.location = Some(location);

        self.config.protocols = request
            .headers
            .get_all("sec-websocket-protocol")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        self.accept = Some(compute_accept_key(key));
        log::debug!(
            "Handshake accepted for {} (protocols: {:?})",
            request.path,
            self.config.protocols
        );

        Ok(StatusCode::SWITCHING_PROTOCOLS)
    }

    /// The negotiated configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access for a handshake hook.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// The Sec-WebSocket-Accept token, once a request has been validated.
    #[must_use]
    pub fn accept_key(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    /// Consume the negotiator, keeping the configuration for the connection.
    #[must_use]
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Serialize the 101 Switching Protocols response.
    ///
    /// # Errors
    ///
    /// - `UnresolvedProtocol` if more than one subprotocol candidate remains
    /// - `MissingKey` if no request has been validated yet
    /// - `Malformed` if the chosen subprotocol contains CR or LF
    pub fn response(&self) -> Result<Vec<u8>, HandshakeError> {
        if self.config.protocols.len() > 1 {
            return Err(HandshakeError::UnresolvedProtocol(self.config.protocols.len()));
        }
        let accept = self.accept.as_deref().ok_or(HandshakeError::MissingKey)?;

        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        out.extend_from_slice(b"Upgrade: websocket\r\n");
        out.extend_from_slice(b"Connection: Upgrade\r\n");
        out.extend_from_slice(b"Sec-WebSocket-Accept: ");
        out.extend_from_slice(accept.as_bytes());
        out.extend_from_slice(b"\r\n");

        if let Some(protocol) = self.config.protocol() {
            validate_header_value("Sec-WebSocket-Protocol", protocol)?;
            out.extend_from_slice(b"Sec-WebSocket-Protocol: ");
            out.extend_from_slice(protocol.as_bytes());
            out.extend_from_slice(b"\r\n");
        }

        for (name, value) in &self.config.headers {
            if RESERVED_RESPONSE_HEADERS.contains(&name.as_str()) {
                continue;
            }
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(b"\r\n");
        Ok(out)
    }

    /// Write the 101 response and flush.
    ///
    /// # Errors
    ///
    /// Everything [`response`](Self::response) returns, plus transport errors.
    #[cfg(feature = "async-tokio")]
    pub async fn accept_handshake<W>(&self, w: &mut W) -> crate::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self.response()?;
        w.write_all(&response).await?;
        w.flush().await?;
        Ok(())
    }
}

/// Serialize the plain HTTP response that rejects an upgrade.
///
/// The body is the error text. A 405 also advertises the supported version.
#[must_use]
pub fn rejection_response(err: &HandshakeError) -> Vec<u8> {
    let status = err.status();
    let body = err.to_string();

    let mut out = Vec::with_capacity(128 + body.len());
    out.extend_from_slice(
        format!(
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )
        .as_bytes(),
    );
    if status == StatusCode::METHOD_NOT_ALLOWED {
        out.extend_from_slice(format!("Sec-WebSocket-Version: {SUPPORTED_VERSION}\r\n").as_bytes());
    }
    out.extend_from_slice(b"Content-Type: text/plain; charset=utf-8\r\n");
    out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    out.extend_from_slice(b"Connection: close\r\n\r\n");
    out.extend_from_slice(body.as_bytes());
    out
}

/// Write a rejection response and flush.
#[cfg(feature = "async-tokio")]
pub async fn write_rejection<W>(w: &mut W, err: &HandshakeError) -> crate::Result<()>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(&rejection_response(err)).await?;
    w.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> HandshakeRequest {
        HandshakeRequest::parse(
            b"GET /chat?room=1 HTTP/1.1\r\n\
              Host: example.com\r\n\
              Upgrade: websocket\r\n\
              Connection: keep-alive, Upgrade\r\n\
              Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
              Sec-WebSocket-Version: 13\r\n\r\n",
        )
        .unwrap()
    }

    fn negotiate(request: &HandshakeRequest) -> Result<ServerHandshaker, HandshakeError> {
        let mut handshaker = ServerHandshaker::new(Config::default());
        handshaker.read_handshake(request)?;
        Ok(handshaker)
    }

    #[test]
    fn test_compute_accept_key() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let accept = compute_accept_key(key);
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_parse_request() {
        let req = valid_request();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/chat?room=1");
        assert_eq!(req.host, "example.com");
        assert_eq!(req.header("Sec-WebSocket-Key"), Some("dGhlIHNhbXBsZSBub25jZQ=="));
        assert_eq!(req.header("sec-websocket-version"), Some("13"));
        assert!(!req.tls);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            HandshakeRequest::parse(b""),
            Err(HandshakeError::Malformed(_))
        ));
        assert!(matches!(
            HandshakeRequest::parse(b"GET /\r\n\r\n"),
            Err(HandshakeError::Malformed(_))
        ));
        assert!(matches!(
            HandshakeRequest::parse(b"GET / HTTP/1.1\r\nNoColonHere\r\n\r\n"),
            Err(HandshakeError::Malformed(_))
        ));
        assert!(matches!(
            HandshakeRequest::parse(&[0xff, 0xfe, b'\r', b'\n']),
            Err(HandshakeError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_key() {
        let result = HandshakeRequest::parse(
            b"GET / HTTP/1.1\r\n\
              Host: example.com\r\n\
              Sec-WebSocket-Key: a\r\n\
              Sec-WebSocket-Key: b\r\n\r\n",
        );
        assert!(matches!(result, Err(HandshakeError::Malformed(msg)) if msg.contains("sec-websocket-key")));
    }

    #[test]
    fn test_read_handshake_success() {
        let handshaker = negotiate(&valid_request()).unwrap();
        assert_eq!(handshaker.accept_key(), Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
        assert_eq!(handshaker.config().version, 13);
        assert_eq!(
            handshaker.config().location.as_ref().map(Url::as_str),
            Some("ws://example.com/chat?room=1")
        );
        assert!(handshaker.config().protocols.is_empty());
    }

    #[test]
    fn test_read_handshake_tls_location() {
        let request = valid_request().with_tls(true);
        let handshaker = negotiate(&request).unwrap();
        assert_eq!(
            handshaker.config().location.as_ref().map(Url::scheme),
            Some("wss")
        );
    }

    #[test]
    fn test_read_handshake_bad_method() {
        let mut request = valid_request();
        request.method = Method::POST;
        let err = negotiate(&request).unwrap_err();
        assert_eq!(err, HandshakeError::BadMethod("POST".into()));
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_read_handshake_missing_upgrade() {
        let mut request = valid_request();
        request.headers.remove("upgrade");
        assert_eq!(negotiate(&request).unwrap_err(), HandshakeError::NotWebSocket);

        let mut request = valid_request();
        request
            .headers
            .insert("connection", HeaderValue::from_static("keep-alive"));
        assert_eq!(negotiate(&request).unwrap_err(), HandshakeError::NotWebSocket);
    }

    #[test]
    fn test_read_handshake_missing_key() {
        let mut request = valid_request();
        request.headers.remove("sec-websocket-key");
        assert_eq!(negotiate(&request).unwrap_err(), HandshakeError::MissingKey);

        let mut request = valid_request();
        request
            .headers
            .insert("sec-websocket-key", HeaderValue::from_static(""));
        assert_eq!(negotiate(&request).unwrap_err(), HandshakeError::MissingKey);
    }

    #[test]
    fn test_read_handshake_bad_version() {
        let mut request = valid_request();
        request
            .headers
            .insert("sec-websocket-version", HeaderValue::from_static("8"));
        let err = negotiate(&request).unwrap_err();
        assert_eq!(err, HandshakeError::BadVersion("8".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_read_handshake_missing_host() {
        let mut request = valid_request();
        request.host.clear();
        assert!(matches!(
            negotiate(&request),
            Err(HandshakeError::BadLocation(_))
        ));
    }

    #[test]
    fn test_protocols_come_from_client_offer() {
        let mut config = Config::default();
        config.protocols = vec!["server-side".into()];
        let mut handshaker = ServerHandshaker::new(config);

        handshaker.read_handshake(&valid_request()).unwrap();
        assert!(handshaker.config().protocols.is_empty());
    }

    #[test]
    fn test_protocol_candidates() {
        let request = valid_request()
            .with_header("Sec-WebSocket-Protocol", "chat, superchat")
            .unwrap()
            .with_header("Sec-WebSocket-Protocol", " v2 ")
            .unwrap();
        let handshaker = negotiate(&request).unwrap();
        assert_eq!(handshaker.config().protocols, ["chat", "superchat", "v2"]);

        // Unresolved candidates block the response.
        assert_eq!(
            handshaker.response().unwrap_err(),
            HandshakeError::UnresolvedProtocol(3)
        );
    }

    #[test]
    fn test_response_format() {
        let mut handshaker = negotiate(&valid_request()).unwrap();
        handshaker.config_mut().protocols = vec!["chat".into()];
        handshaker
            .config_mut()
            .headers
            .insert("x-served-by", HeaderValue::from_static("hybi"));
        handshaker
            .config_mut()
            .headers
            .insert("sec-websocket-accept", HeaderValue::from_static("forged"));

        let response = String::from_utf8(handshaker.response().unwrap()).unwrap();
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Upgrade: websocket\r\n"));
        assert!(response.contains("Connection: Upgrade\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(response.contains("Sec-WebSocket-Protocol: chat\r\n"));
        assert!(response.contains("x-served-by: hybi\r\n"));
        assert!(!response.contains("forged"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_response_rejects_crlf_protocol() {
        let mut handshaker = negotiate(&valid_request()).unwrap();
        handshaker.config_mut().protocols = vec!["chat\r\nX-Evil: 1".into()];
        assert!(matches!(
            handshaker.response(),
            Err(HandshakeError::Malformed(_))
        ));
    }

    #[test]
    fn test_response_requires_validated_request() {
        let handshaker = ServerHandshaker::new(Config::default());
        assert_eq!(handshaker.response().unwrap_err(), HandshakeError::MissingKey);
    }

    #[test]
    fn test_rejection_response() {
        let response = String::from_utf8(rejection_response(&HandshakeError::BadMethod("POST".into()))).unwrap();
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(response.ends_with("\r\n\r\nbad method: POST"));

        let response = String::from_utf8(rejection_response(&HandshakeError::MissingKey)).unwrap();
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(!response.contains("Sec-WebSocket-Version"));
        assert!(response.ends_with("missing key"));
    }

    #[test]
    fn test_from_http_parts() {
        let (parts, ()) = http::Request::builder()
            .method("GET")
            .uri("/socket?x=1")
            .header("host", "localhost:9000")
            .header("upgrade", "websocket")
            .header("connection", "Upgrade")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("sec-websocket-version", "13")
            .body(())
            .unwrap()
            .into_parts();

        let request = HandshakeRequest::from_http(&parts, true);
        assert_eq!(request.host, "localhost:9000");
        assert_eq!(request.path, "/socket?x=1");
        assert!(request.tls);

        let handshaker = negotiate(&request).unwrap();
        assert_eq!(
            handshaker.config().location.as_ref().map(Url::as_str),
            Some("wss://localhost:9000/socket?x=1")
        );
    }

    #[cfg(feature = "async-tokio")]
    #[tokio::test]
    async fn test_read_from_stops_at_blank_line() {
        let data = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n\x81\x00";
        let mut src = tokio::io::BufReader::new(&data[..]);
        let request = HandshakeRequest::read_from(&mut src, &Limits::default())
            .await
            .unwrap();
        assert_eq!(request.host, "a");

        let mut rest = Vec::new();
        src.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, [0x81, 0x00]);
    }

    #[cfg(feature = "async-tokio")]
    #[tokio::test]
    async fn test_read_from_enforces_limit() {
        let mut data = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        data.extend(vec![b'a'; 200]);
        data.extend_from_slice(b"\r\n\r\n");
        let mut src = tokio::io::BufReader::new(&data[..]);
        let result = HandshakeRequest::read_from(&mut src, &Limits::new(1024, 64)).await;
        assert!(matches!(
            result,
            Err(crate::Error::Handshake(HandshakeError::TooLarge { max: 64, .. }))
        ));
    }

    #[cfg(feature = "async-tokio")]
    #[tokio::test]
    async fn test_read_from_eof() {
        let mut src = tokio::io::BufReader::new(&b"GET / HTTP/1.1\r\nHost: a\r\n"[..]);
        let result = HandshakeRequest::read_from(&mut src, &Limits::default()).await;
        assert!(matches!(
            result,
            Err(crate::Error::Handshake(HandshakeError::Malformed(_)))
        ));
    }
}
