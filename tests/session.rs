//! End-to-end behaviour of a session driven over an in-memory stream.

use async_trait::async_trait;
use bytes::Bytes;
use rstest::rstest;
use tokio_util::sync::CancellationToken;
use wiresock::{
    config::SessionConfig,
    frame::Frame,
    protocol::{OpCode, StatusCode},
    session::{
        CloseInitiator,
        EchoHandler,
        FixedReply,
        MessageHandler,
        Session,
        SessionState,
    },
};
use wiresock_testing::{ClientFrame, drive_session};

fn status(frame: &Frame) -> Option<u16> { frame.close_status.map(StatusCode::as_u16) }

#[tokio::test]
async fn replies_follow_request_order() {
    let run = drive_session(
        Session::new(EchoHandler),
        vec![
            ClientFrame::ping("p").encode(),
            ClientFrame::text("a").encode(),
            ClientFrame::text("b").encode(),
            ClientFrame::close(1000).encode(),
        ],
    )
    .await
    .expect("drive session");

    let got: Vec<_> = run
        .frames
        .iter()
        .map(|f| (f.opcode, f.payload.clone()))
        .collect();
    assert_eq!(
        got,
        vec![
            (OpCode::Pong, Bytes::from_static(b"p")),
            (OpCode::Text, Bytes::from_static(b"a")),
            (OpCode::Text, Bytes::from_static(b"b")),
            (OpCode::Close, Bytes::new()),
        ]
    );
    assert_eq!(run.outcome.state, SessionState::Closed);
    assert_eq!(run.outcome.initiator, Some(CloseInitiator::Peer));
    assert_eq!(run.outcome.frames_received, 4);
    assert_eq!(run.outcome.frames_sent, 4);
}

#[tokio::test]
async fn nothing_is_written_after_the_close_frame() {
    let run = drive_session(
        Session::new(EchoHandler),
        vec![
            ClientFrame::close(1000).encode(),
            ClientFrame::text("too late").encode(),
            ClientFrame::ping("").encode(),
        ],
    )
    .await
    .expect("drive session");

    assert_eq!(run.frames.len(), 1);
    assert!(run.frames[0].is_close());
    assert_eq!(run.outcome.frames_received, 1);
}

#[tokio::test]
async fn peer_close_status_and_reason_are_echoed() {
    let run = drive_session(
        Session::new(EchoHandler),
        vec![ClientFrame::close_with_reason(4000, "bye").encode()],
    )
    .await
    .expect("drive session");

    let close = &run.frames[0];
    assert_eq!(status(close), Some(4000));
    assert_eq!(close.reason(), Some("bye"));
    assert_eq!(run.outcome.close_status, Some(StatusCode(4000)));
}

#[tokio::test]
async fn close_without_status_is_answered_with_normal_closure() {
    let run = drive_session(Session::new(EchoHandler), vec![ClientFrame::empty_close().encode()])
        .await
        .expect("drive session");
    assert_eq!(status(&run.frames[0]), Some(1000));
}

#[rstest]
#[case::no_status_received(1005, 1002)]
#[case::below_range(999, 1002)]
#[case::reserved(1004, 1002)]
#[case::going_away(1001, 1001)]
#[tokio::test]
async fn peer_close_status_is_validated(#[case] sent: u16, #[case] expected: u16) {
    let run = drive_session(Session::new(EchoHandler), vec![ClientFrame::close(sent).encode()])
        .await
        .expect("drive session");
    assert_eq!(status(&run.frames[0]), Some(expected));
}

#[rstest]
#[case::unmasked(ClientFrame::text("x").unmasked(), 1002)]
#[case::reserved_opcode(ClientFrame::raw(0x5, "x"), 1002)]
#[case::reserved_control_opcode(ClientFrame::raw(0xC, ""), 1002)]
#[case::reserved_bits(ClientFrame::text("x").rsv(0b100), 1002)]
#[case::fragmented_ping(ClientFrame::ping("x").fin(false), 1002)]
#[case::oversized_ping(ClientFrame::ping(vec![0u8; 126]), 1002)]
#[case::one_byte_close(ClientFrame::new(OpCode::Close, vec![3u8]), 1002)]
#[case::invalid_utf8(ClientFrame::text(vec![0xFF_u8, 0xFE]), 1007)]
#[tokio::test]
async fn protocol_violations_close_the_session(#[case] frame: ClientFrame, #[case] expected: u16) {
    let run = drive_session(
        Session::new(EchoHandler),
        vec![frame.encode(), ClientFrame::text("ignored").encode()],
    )
    .await
    .expect("drive session");

    assert_eq!(run.frames.len(), 1, "only the close frame is written");
    assert_eq!(status(&run.frames[0]), Some(expected));
    assert_eq!(run.outcome.initiator, Some(CloseInitiator::Error));
}

#[tokio::test]
async fn declared_length_over_limit_closes_with_message_too_big() {
    let config = SessionConfig::default().max_payload_length(1024);
    let run = drive_session(
        Session::new(EchoHandler).config(config),
        vec![ClientFrame::binary(vec![1u8; 2048]).encode()],
    )
    .await
    .expect("drive session");
    assert_eq!(status(&run.frames[0]), Some(1009));
}

#[tokio::test]
async fn relaxed_config_accepts_reserved_bits_and_raw_text() {
    let config = SessionConfig::default()
        .allow_reserved_bits(true)
        .validate_utf8(false);
    let run = drive_session(
        Session::new(EchoHandler).config(config),
        vec![
            ClientFrame::text(vec![0xFF_u8]).rsv(0b010).encode(),
            ClientFrame::close(1000).encode(),
        ],
    )
    .await
    .expect("drive session");

    assert_eq!(run.frames[0].opcode, OpCode::Text);
    assert_eq!(&run.frames[0].payload[..], &[0xFF]);
    assert_eq!(run.frames[0].rsv, 0, "server frames never set reserved bits");
}

#[tokio::test]
async fn end_of_stream_without_close_sends_protocol_error() {
    let run = drive_session(Session::new(EchoHandler), vec![ClientFrame::binary("a").encode()])
        .await
        .expect("drive session");

    assert_eq!(run.frames.len(), 2);
    assert_eq!(run.frames[0].opcode, OpCode::Binary);
    assert_eq!(status(&run.frames[1]), Some(1002));
    assert_eq!(run.outcome.initiator, Some(CloseInitiator::Error));
}

#[tokio::test]
async fn pong_and_continuation_frames_get_no_reply() {
    let run = drive_session(
        Session::new(EchoHandler),
        vec![
            ClientFrame::pong("unsolicited").encode(),
            ClientFrame::new(OpCode::Continuation, "tail").encode(),
            ClientFrame::close(1000).encode(),
        ],
    )
    .await
    .expect("drive session");

    assert_eq!(run.frames.len(), 1);
    assert!(run.frames[0].is_close());
}

#[tokio::test]
async fn fixed_reply_keeps_the_inbound_opcode() {
    let run = drive_session(
        Session::new(FixedReply::new("ack")),
        vec![
            ClientFrame::binary(vec![1_u8, 2, 3]).encode(),
            ClientFrame::close(1000).encode(),
        ],
    )
    .await
    .expect("drive session");

    assert_eq!(run.frames[0].opcode, OpCode::Binary);
    assert_eq!(&run.frames[0].payload[..], b"ack");
}

struct Silent;

#[async_trait]
impl MessageHandler for Silent {
    async fn on_message(&self, _opcode: OpCode, _payload: Bytes) -> Option<Bytes> { None }
}

#[tokio::test]
async fn handler_may_decline_to_reply() {
    let run = drive_session(
        Session::new(Silent),
        vec![ClientFrame::text("hello").encode(), ClientFrame::close(1000).encode()],
    )
    .await
    .expect("drive session");

    assert_eq!(run.frames.len(), 1);
    assert_eq!(run.outcome.frames_received, 2);
}

#[tokio::test]
async fn large_payloads_round_trip_across_read_growth() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(3 * 1024 * 1024).collect();
    let run = drive_session(
        Session::new(EchoHandler),
        vec![
            ClientFrame::binary(payload.clone()).mask([9, 8, 7, 6]).encode(),
            ClientFrame::close(1000).encode(),
        ],
    )
    .await
    .expect("drive session");

    assert_eq!(run.frames[0].payload.len(), payload.len());
    assert_eq!(&run.frames[0].payload[..], &payload[..]);
}

#[tokio::test]
async fn stop_token_closes_with_going_away() {
    let (server, mut client) = tokio::io::duplex(1024);
    let stop = CancellationToken::new();
    let session = Session::new(EchoHandler).stop_on(stop.clone());
    let handle = tokio::spawn(session.run(server));

    stop.cancel();
    let outcome = handle
        .await
        .expect("session task")
        .expect("session result");

    let mut bytes = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut client, &mut bytes)
        .await
        .expect("read server output");
    let frames = wiresock_testing::server_frames(&bytes).expect("frames");
    assert_eq!(frames.len(), 1);
    assert_eq!(status(&frames[0]), Some(1001));
    assert_eq!(outcome.initiator, Some(CloseInitiator::Local));
    assert_eq!(outcome.state, SessionState::Closed);
}

#[tokio::test]
async fn prefetched_bytes_are_processed_first() {
    let mut early = ClientFrame::text("early").encode();
    let close = ClientFrame::close(1000).encode();
    early.extend_from_slice(&close[..3]);
    let run = drive_session(
        Session::new(EchoHandler).prefetched(bytes::BytesMut::from(&early[..])),
        vec![close[3..].to_vec()],
    )
    .await
    .expect("drive session");

    assert_eq!(&run.frames[0].payload[..], b"early");
    assert!(run.frames[1].is_close());
}
