//! Server side of the RFC 6455 opening handshake.
//!
//! [`accept`] reads the client's HTTP upgrade request, checks it, and
//! answers `101 Switching Protocols` with the computed
//! `Sec-WebSocket-Accept` value. Bytes that arrived after the request head
//! are returned so the session can decode them before reading the
//! transport.

use std::io;

use base64::Engine as _;
use bytes::{BufMut, BytesMut};
use http::{HeaderValue, Method, Request, Response, StatusCode, Version, header};
use log::{debug, info};
use sha1::{Digest, Sha1};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// GUID appended to the client key before hashing.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Largest request head accepted (16 KiB).
pub const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// Largest number of request headers accepted.
pub const MAX_HEADERS: usize = 32;

const READ_CHUNK: usize = 1024;

/// Errors raised while upgrading a connection.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The request is well formed HTTP but not a valid WebSocket upgrade.
    #[error("invalid upgrade request: {0}")]
    InvalidUpgrade(String),

    /// The request head is not valid HTTP/1.1.
    #[error("malformed request: {0}")]
    Malformed(#[from] httparse::Error),

    /// The request head exceeds [`MAX_REQUEST_HEAD`].
    #[error("request head exceeds {MAX_REQUEST_HEAD} bytes")]
    HeadersTooLarge,

    /// The peer closed the connection before the request head was complete.
    #[error("connection closed during handshake")]
    ConnectionClosed,

    /// Reading or writing the transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HandshakeError {
    fn invalid(reason: impl Into<String>) -> Self { Self::InvalidUpgrade(reason.into()) }
}

/// Compute the `Sec-WebSocket-Accept` value for `client_key`.
///
/// # Examples
///
/// ```
/// use wiresock::handshake::accept_key;
///
/// assert_eq!(
///     accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
#[must_use]
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

fn header_str<'a>(request: &'a Request<()>, name: &str) -> Result<&'a str, HandshakeError> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HandshakeError::invalid(format!("missing {name} header")))
}

/// Check that `request` asks for a WebSocket upgrade and return its
/// `Sec-WebSocket-Key`.
///
/// # Errors
///
/// Returns [`HandshakeError::InvalidUpgrade`] unless the request is a `GET`
/// with `Upgrade: websocket`, a `Connection` header listing `upgrade`,
/// `Sec-WebSocket-Version: 13` and a non-empty `Sec-WebSocket-Key`.
pub fn validate_upgrade_request(request: &Request<()>) -> Result<String, HandshakeError> {
    if request.method() != Method::GET {
        return Err(HandshakeError::invalid("method must be GET"));
    }

    let upgrade = header_str(request, header::UPGRADE.as_str())?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(HandshakeError::invalid("Upgrade header must be 'websocket'"));
    }

    let connection = header_str(request, header::CONNECTION.as_str())?;
    if !connection
        .split(',')
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
    {
        return Err(HandshakeError::invalid(
            "Connection header must contain 'Upgrade'",
        ));
    }

    let version = header_str(request, header::SEC_WEBSOCKET_VERSION.as_str())?;
    if version.trim() != "13" {
        return Err(HandshakeError::invalid(format!(
            "unsupported WebSocket version: {version}"
        )));
    }

    let key = header_str(request, header::SEC_WEBSOCKET_KEY.as_str())?.trim();
    if key.is_empty() {
        return Err(HandshakeError::invalid("empty Sec-WebSocket-Key header"));
    }
    Ok(key.to_owned())
}

/// Build the `101 Switching Protocols` response carrying `accept`.
///
/// # Errors
///
/// Returns [`HandshakeError::InvalidUpgrade`] if `accept` is not a valid
/// header value.
pub fn switching_protocols(accept: &str) -> Result<Response<()>, HandshakeError> {
    let accept = HeaderValue::from_str(accept)
        .map_err(|e| HandshakeError::invalid(format!("invalid accept value: {e}")))?;
    let mut response = Response::new(());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
    Ok(response)
}

fn bad_request() -> Response<()> {
    let mut response = Response::new(());
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
    response
}

/// Read one HTTP request head from `stream`.
///
/// Returns the request and any bytes received after the head.
///
/// # Errors
///
/// - [`HandshakeError::Malformed`] if the head does not parse.
/// - [`HandshakeError::HeadersTooLarge`] if the head exceeds [`MAX_REQUEST_HEAD`].
/// - [`HandshakeError::ConnectionClosed`] if the stream ends first.
/// - [`HandshakeError::Io`] if a read fails.
pub async fn read_request<S>(stream: &mut S) -> Result<(Request<()>, BytesMut), HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        if let Some((request, head_len)) = parse_request(&buf)? {
            let leftover = buf.split_off(head_len);
            debug!(
                "upgrade request read: uri={}, head_len={head_len}, leftover={}",
                request.uri(),
                leftover.len()
            );
            return Ok((request, leftover));
        }
        if buf.len() >= MAX_REQUEST_HEAD {
            return Err(HandshakeError::HeadersTooLarge);
        }
        let limit = u64::try_from(MAX_REQUEST_HEAD - buf.len()).unwrap_or(u64::MAX);
        buf.reserve(READ_CHUNK);
        if (&mut *stream).take(limit).read_buf(&mut buf).await? == 0 {
            return Err(HandshakeError::ConnectionClosed);
        }
    }
}

fn parse_request(buf: &[u8]) -> Result<Option<(Request<()>, usize)>, HandshakeError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut headers);
    let httparse::Status::Complete(head_len) = parsed.parse(buf)? else {
        return Ok(None);
    };

    let mut builder = Request::builder()
        .method(parsed.method.unwrap_or_default())
        .uri(parsed.path.unwrap_or("/"))
        .version(match parsed.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        });
    for h in parsed.headers.iter() {
        builder = builder.header(h.name, h.value);
    }
    let request = builder
        .body(())
        .map_err(|e| HandshakeError::invalid(e.to_string()))?;
    Ok(Some((request, head_len)))
}

/// Write `response` as an HTTP/1.1 response head and flush.
///
/// # Errors
///
/// Returns [`HandshakeError::Io`] if writing or flushing fails.
pub async fn write_response<S>(stream: &mut S, response: &Response<()>) -> Result<(), HandshakeError>
where
    S: AsyncWrite + Unpin,
{
    let status = response.status();
    let mut head = BytesMut::with_capacity(256);
    head.put_slice(b"HTTP/1.1 ");
    head.put_slice(status.as_str().as_bytes());
    head.put_u8(b' ');
    head.put_slice(status.canonical_reason().unwrap_or("").as_bytes());
    head.put_slice(b"\r\n");
    for (name, value) in response.headers() {
        head.put_slice(name.as_str().as_bytes());
        head.put_slice(b": ");
        head.put_slice(value.as_bytes());
        head.put_slice(b"\r\n");
    }
    head.put_slice(b"\r\n");
    stream.write_all(&head).await?;
    stream.flush().await?;
    Ok(())
}

/// Run the server side of the opening handshake on `stream`.
///
/// On success the `101` response has been written and the returned bytes
/// are the start of the WebSocket stream. An invalid upgrade request is
/// answered with `400 Bad Request` before the error is returned.
///
/// # Errors
///
/// Any [`HandshakeError`] from reading, validating or responding.
pub async fn accept<S>(stream: &mut S) -> Result<BytesMut, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (request, leftover) = read_request(stream).await?;
    let key = match validate_upgrade_request(&request) {
        Ok(key) => key,
        Err(e) => {
            info!("rejecting upgrade: error={e}");
            write_response(stream, &bad_request()).await?;
            return Err(e);
        }
    };
    let response = switching_protocols(&accept_key(&key))?;
    write_response(stream, &response).await?;
    Ok(leftover)
}
