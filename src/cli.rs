//! Command line interface for the `wiresock` server binary.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `wiresock` binary.
#[derive(Debug, Parser)]
#[command(name = "wiresock", version, about = "Minimal RFC 6455 WebSocket server")]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:9001")]
    pub bind: SocketAddr,

    /// Number of accept workers. Defaults to the number of CPU cores.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Largest accepted frame payload in bytes.
    #[arg(long)]
    pub max_payload: Option<usize>,

    /// Answer every data frame with this text instead of echoing it.
    #[arg(short, long)]
    pub reply: Option<String>,

    /// Accept frames with RSV1-3 set.
    #[arg(long)]
    pub allow_reserved_bits: bool,

    /// Skip UTF-8 validation of text frames.
    #[arg(long)]
    pub no_utf8_validation: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults_to_local_echo_server() {
        let cli = Cli::parse_from(["wiresock"]);
        assert_eq!(cli.bind, "127.0.0.1:9001".parse().expect("addr"));
        assert!(cli.workers.is_none());
        assert!(cli.reply.is_none());
        assert!(!cli.allow_reserved_bits);
        assert!(!cli.no_utf8_validation);
    }

    #[test]
    fn parses_all_options() {
        let cli = Cli::parse_from([
            "wiresock",
            "--bind",
            "0.0.0.0:8080",
            "--workers",
            "4",
            "--max-payload",
            "65536",
            "--reply",
            "hello",
            "--allow-reserved-bits",
            "--no-utf8-validation",
        ]);
        assert_eq!(cli.bind.port(), 8080);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.max_payload, Some(65536));
        assert_eq!(cli.reply.as_deref(), Some("hello"));
        assert!(cli.allow_reserved_bits);
        assert!(cli.no_utf8_validation);
    }

    #[test]
    fn rejects_bad_address() {
        assert!(Cli::try_parse_from(["wiresock", "--bind", "nowhere"]).is_err());
    }
}
