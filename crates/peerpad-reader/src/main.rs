//! Peer Pad reader binary
//!
//! Serves one Peer Pad document as HTML, or prints it once with `--print`.

use peerpad_reader::{ReaderConfig, ReaderNode};
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!("read-peer-pad - Serve a Peer Pad document as HTML");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  read-peer-pad            Serve the document over HTTP");
    eprintln!("  read-peer-pad --print    Print title and content, then exit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PEER_PAD_URL                 Pad URL (#/w/markdown/<name>/<key>), required");
    eprintln!("  PEER_PAD_API_ADDR            HTTP listen address (default: 0.0.0.0:8080)");
    eprintln!("  PEER_PAD_PEERS               Comma-separated host:port peers");
    eprintln!("  PEER_PAD_APP                 Application name (default: peer-pad/2)");
    eprintln!("  PEER_PAD_RENDER_DELAY_MS     Delay before each render (default: 1000)");
    eprintln!("  PEER_PAD_STOP_DELAY_MS       Delay before exiting on /_stop (default: 500)");
    eprintln!("  PEER_PAD_REQUEST_TIMEOUT_MS  Per-request deadline (default: none)");
    eprintln!("  PEER_PAD_LIVE_READ           Re-read the document on every request");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so print mode keeps stdout for the document.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "read_peer_pad=info,peerpad_reader=info,peerpad_replica=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut print = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--print" | "-p" => print = true,
            "-h" | "--help" | "help" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Nothing touches the network before the configuration is known good.
    let config = match ReaderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let node = ReaderNode::new(config);

    if print {
        match node.fetch().await {
            Ok(doc) => {
                let mut stdout = std::io::stdout().lock();
                write!(stdout, "Title: {}\n\n{}\n", doc.title, doc.content)?;
                stdout.flush()?;
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Exception: {}", e);
                std::process::exit(1);
            }
        }
    }

    node.run().await?;

    Ok(())
}
