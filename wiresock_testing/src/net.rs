//! Helpers for tests that go through a real TCP socket.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Convenience result type for integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Key from the RFC 6455 §1.3 example handshake.
pub const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

/// Bind a listener on an ephemeral localhost port.
///
/// ```
/// use wiresock_testing::{TestResult, unused_listener};
///
/// fn example() -> TestResult {
///     let listener = unused_listener()?;
///     assert!(listener.local_addr()?.port() > 0);
///     Ok(())
/// }
/// # example().unwrap();
/// ```
///
/// # Errors
///
/// Returns any error from binding the socket.
pub fn unused_listener() -> std::io::Result<StdTcpListener> {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr)
}

/// A browser-style upgrade request for `/` carrying `key`.
#[must_use]
pub fn handshake_request(key: &str) -> Vec<u8> {
    format!(
        "GET / HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\nSec-WebSocket-Version: 13\r\n\r\n"
    )
    .into_bytes()
}

/// Connect to `addr`, perform the opening handshake and return the stream
/// with the response head.
///
/// # Errors
///
/// Returns an error if connecting, writing or reading fails, or if the
/// stream ends before the response head is complete.
pub async fn connect_and_upgrade(addr: SocketAddr) -> TestResult<(TcpStream, String)> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(&handshake_request(SAMPLE_KEY)).await?;

    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).await? == 0 {
            return Err("stream closed during handshake".into());
        }
        head.push(byte[0]);
    }
    Ok((stream, String::from_utf8(head)?))
}
