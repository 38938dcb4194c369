//! In-memory driving helpers for sessions.

use std::io;

use futures::FutureExt as _;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
use wiresock::{
    codec::parse_frame,
    frame::Frame,
    session::{MessageHandler, Session, SessionOutcome},
};

const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Everything observed while driving a session.
#[derive(Debug)]
pub struct DriveResult {
    /// Frames the server wrote, in order.
    pub frames: Vec<Frame>,
    /// Raw bytes the server wrote.
    pub bytes: Vec<u8>,
    /// What the session reported when it finished.
    pub outcome: SessionOutcome,
}

/// Run `session` over a duplex stream, writing each entry of `client` to it
/// in order, and collect the server's output.
///
/// The client half shuts down its write side after the last entry and reads
/// until the server closes the stream. Writes the server no longer reads,
/// such as frames sent after a close, are discarded.
///
/// # Errors
///
/// Returns an error if the session fails, if the server output does not
/// parse as frames, or if the server task panics (message beginning with
/// `"server task failed"`).
pub async fn drive_session<H>(session: Session<H>, client: Vec<Vec<u8>>) -> io::Result<DriveResult>
where
    H: MessageHandler,
{
    drive_session_with_capacity(session, client, DEFAULT_CAPACITY).await
}

/// [`drive_session`] with an explicit duplex buffer size.
///
/// # Errors
///
/// See [`drive_session`].
pub async fn drive_session_with_capacity<H>(
    session: Session<H>,
    client: Vec<Vec<u8>>,
    capacity: usize,
) -> io::Result<DriveResult>
where
    H: MessageHandler,
{
    let (client_io, server_io) = duplex(capacity);
    let (mut client_rx, mut client_tx) = tokio::io::split(client_io);

    let server_fut = async {
        match std::panic::AssertUnwindSafe(session.run(server_io))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(io::Error::other(e)),
            Err(panic) => Err(io::Error::other(format!(
                "server task failed: {}",
                panic_text(panic.as_ref())
            ))),
        }
    };

    let write_fut = async {
        for chunk in &client {
            if let Err(e) = client_tx.write_all(chunk).await {
                if e.kind() == io::ErrorKind::BrokenPipe {
                    break;
                }
                return Err(e);
            }
        }
        // The server may already have dropped its end.
        let _ = client_tx.shutdown().await;
        io::Result::Ok(())
    };

    let read_fut = async {
        let mut buf = Vec::new();
        client_rx.read_to_end(&mut buf).await?;
        io::Result::Ok(buf)
    };

    let (outcome, (), bytes) = tokio::try_join!(server_fut, write_fut, read_fut)?;
    let frames = server_frames(&bytes)?;
    Ok(DriveResult {
        frames,
        bytes,
        outcome,
    })
}

/// Parse every frame in `bytes`.
///
/// # Errors
///
/// Returns `InvalidData` if the bytes do not form a whole number of frames.
pub fn server_frames(mut bytes: &[u8]) -> io::Result<Vec<Frame>> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        match parse_frame(bytes) {
            Ok(Some((frame, used))) => {
                frames.push(frame);
                bytes = &bytes[used..];
            }
            Ok(None) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("truncated server frame: {} trailing bytes", bytes.len()),
                ));
            }
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
    Ok(frames)
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_owned()))
        .unwrap_or_else(|| format!("{panic:?}"))
}
