//! `wiresock` server binary.
//!
//! Listens for WebSocket upgrades and echoes data frames, or answers them
//! with a fixed text when `--reply` is given. Stops on Ctrl+C.

mod cli;

use std::net::SocketAddr;

use bytes::Bytes;
use clap::Parser;
use wiresock::{
    config::SessionConfig,
    server::{HandlerFactory, ServerError, WebSocketServer},
    session::{EchoHandler, FixedReply},
};

fn session_config(cli: &cli::Cli) -> SessionConfig {
    let config = SessionConfig::default()
        .allow_reserved_bits(cli.allow_reserved_bits)
        .validate_utf8(!cli.no_utf8_validation);
    match cli.max_payload {
        Some(max) => config.max_payload_length(max),
        None => config,
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let config = session_config(&cli);

    match cli.reply {
        Some(text) => {
            let reply = FixedReply::new(Bytes::from(text));
            serve(move || reply.clone(), cli.bind, cli.workers, config).await
        }
        None => serve(|| EchoHandler, cli.bind, cli.workers, config).await,
    }
}

async fn serve<F>(
    factory: F,
    addr: SocketAddr,
    workers: Option<usize>,
    config: SessionConfig,
) -> Result<(), ServerError>
where
    F: HandlerFactory,
{
    let mut server = WebSocketServer::new(factory).session_config(config);
    if let Some(count) = workers {
        server = server.workers(count);
    }
    let server = server.bind(addr)?;
    log::info!("listening: addr={:?}", server.local_addr());
    server.run().await
}
