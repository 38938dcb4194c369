//! End-to-end tests for `WebSocketServer` over real TCP sockets.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use wiresock::{
    config::SessionConfig,
    frame::Frame,
    handshake::accept_key,
    parse_frame,
    protocol::{OpCode, StatusCode},
    server::{HandlerFactory, ServerError, WebSocketServer},
    session::{EchoHandler, FixedReply},
};
use wiresock_testing::{
    ClientFrame,
    SAMPLE_KEY,
    TestResult,
    connect_and_upgrade,
    server_frames,
    unused_listener,
};

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl Running {
    async fn stop(self) -> TestResult {
        let _ = self.stop.send(());
        timeout(Duration::from_secs(5), self.handle).await???;
        Ok(())
    }
}

async fn start<F: HandlerFactory>(factory: F, config: SessionConfig) -> TestResult<Running> {
    start_server(WebSocketServer::new(factory).session_config(config)).await
}

async fn start_server<F: HandlerFactory>(server: WebSocketServer<F>) -> TestResult<Running> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop, stop_rx) = oneshot::channel::<()>();
    let server = server
        .workers(2)
        .ready_signal(ready_tx)
        .bind_listener(unused_listener()?)?;
    let addr = server.local_addr().ok_or("server has no local address")?;
    let handle = tokio::spawn(server.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));
    ready_rx.await?;
    Ok(Running { addr, stop, handle })
}

async fn read_frame(stream: &mut TcpStream, buf: &mut BytesMut) -> TestResult<Frame> {
    loop {
        if let Some((frame, used)) = parse_frame(buf)? {
            let _ = buf.split_to(used);
            return Ok(frame);
        }
        if stream.read_buf(buf).await? == 0 {
            return Err("stream closed before a whole frame arrived".into());
        }
    }
}

#[tokio::test]
async fn upgrade_returns_accept_key() -> TestResult {
    let server = start(|| EchoHandler, SessionConfig::default()).await?;
    let (mut stream, head) = connect_and_upgrade(server.addr).await?;

    let head = head.to_ascii_lowercase();
    assert!(head.starts_with("http/1.1 101 switching protocols\r\n"));
    assert!(head.contains("upgrade: websocket\r\n"));
    let expected = format!("sec-websocket-accept: {}\r\n", accept_key(SAMPLE_KEY));
    assert!(head.contains(&expected.to_ascii_lowercase()));

    stream.write_all(&ClientFrame::close(1000).encode()).await?;
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await?;
    let frames = server_frames(&rest)?;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].close_status, Some(StatusCode::NORMAL_CLOSURE));

    server.stop().await
}

#[tokio::test]
async fn data_frames_are_echoed() -> TestResult {
    let server = start(|| EchoHandler, SessionConfig::default()).await?;
    let (mut stream, _) = connect_and_upgrade(server.addr).await?;
    let mut buf = BytesMut::new();

    stream.write_all(&ClientFrame::text("hello").encode()).await?;
    let reply = read_frame(&mut stream, &mut buf).await?;
    assert_eq!(reply.opcode, OpCode::Text);
    assert_eq!(&reply.payload[..], b"hello");

    stream.write_all(&ClientFrame::ping("are you there").encode()).await?;
    let pong = read_frame(&mut stream, &mut buf).await?;
    assert_eq!(pong.opcode, OpCode::Pong);
    assert_eq!(&pong.payload[..], b"are you there");

    stream.write_all(&ClientFrame::close(1000).encode()).await?;
    let close = read_frame(&mut stream, &mut buf).await?;
    assert_eq!(close.opcode, OpCode::Close);

    server.stop().await
}

#[tokio::test]
async fn frame_sent_with_the_upgrade_is_not_lost() -> TestResult {
    let server = start(|| EchoHandler, SessionConfig::default()).await?;
    let mut stream = TcpStream::connect(server.addr).await?;
    let mut request = wiresock_testing::handshake_request(SAMPLE_KEY);
    request.extend(ClientFrame::binary(vec![1_u8, 2, 3]).encode());
    request.extend(ClientFrame::close(1000).encode());
    stream.write_all(&request).await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    let head_end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or("response head not terminated")?
        + 4;
    let frames = server_frames(&response[head_end..])?;
    let opcodes: Vec<_> = frames.iter().map(|f| f.opcode).collect();
    assert_eq!(opcodes, vec![OpCode::Binary, OpCode::Close]);
    assert_eq!(&frames[0].payload[..], &[1, 2, 3]);

    server.stop().await
}

#[tokio::test]
async fn each_connection_gets_its_own_handler() -> TestResult {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let factory = move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        FixedReply::new(format!("handler {n}"))
    };
    let server = start(factory, SessionConfig::default()).await?;

    for _ in 0..2 {
        let (mut stream, _) = connect_and_upgrade(server.addr).await?;
        let mut buf = BytesMut::new();
        stream.write_all(&ClientFrame::text("hi").encode()).await?;
        let reply = read_frame(&mut stream, &mut buf).await?;
        assert!(reply.payload.starts_with(b"handler "));
        stream.write_all(&ClientFrame::close(1000).encode()).await?;
        let _ = read_frame(&mut stream, &mut buf).await?;
    }
    assert_eq!(built.load(Ordering::SeqCst), 2);

    server.stop().await
}

#[tokio::test]
async fn session_config_applies_to_connections() -> TestResult {
    let config = SessionConfig::default().max_payload_length(16);
    let server = start(|| EchoHandler, config).await?;
    let (mut stream, _) = connect_and_upgrade(server.addr).await?;

    stream.write_all(&ClientFrame::binary(vec![0_u8; 17]).encode()).await?;
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await?;
    let frames = server_frames(&rest)?;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].close_status, Some(StatusCode::MESSAGE_TOO_BIG));

    server.stop().await
}

#[tokio::test]
async fn shutdown_closes_open_sessions_with_going_away() -> TestResult {
    let server = start(|| EchoHandler, SessionConfig::default()).await?;
    let (mut stream, _) = connect_and_upgrade(server.addr).await?;

    let Running { stop, handle, .. } = server;
    let _ = stop.send(());

    let mut rest = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut rest)).await??;
    let frames = server_frames(&rest)?;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].opcode, OpCode::Close);
    assert_eq!(frames[0].close_status, Some(StatusCode::GOING_AWAY));

    timeout(Duration::from_secs(5), handle).await???;
    Ok(())
}

#[tokio::test]
async fn shutdown_is_not_held_up_by_an_idle_handshake() -> TestResult {
    let server = start(|| EchoHandler, SessionConfig::default()).await?;
    let mut idle = TcpStream::connect(server.addr).await?;
    // Let a worker accept the connection before stopping.
    tokio::time::sleep(Duration::from_millis(50)).await;

    server.stop().await?;

    let mut rest = Vec::new();
    timeout(Duration::from_secs(5), idle.read_to_end(&mut rest)).await??;
    assert!(rest.is_empty());
    Ok(())
}

#[tokio::test]
async fn stalled_handshake_is_dropped_after_the_timeout() -> TestResult {
    let server = start_server(
        WebSocketServer::new(|| EchoHandler).handshake_timeout(Duration::from_millis(100)),
    )
    .await?;
    let mut stream = TcpStream::connect(server.addr).await?;
    stream.write_all(b"GET / HTTP/1.1\r\nHost: a\r\n").await?;

    let mut rest = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut rest)).await??;
    assert!(rest.is_empty());

    server.stop().await
}

#[tokio::test]
async fn plain_http_request_is_rejected() -> TestResult {
    let server = start(|| EchoHandler, SessionConfig::default()).await?;
    let mut stream = TcpStream::connect(server.addr).await?;
    stream
        .write_all(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    let response = String::from_utf8(response)?;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    server.stop().await
}
