use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vecload_common::VECTOR_DIMENSION;
use vecload_mock_index::{Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "vecload-mock-index", about = "In-memory vector index for exercising the load tester")]
struct Args {
    /// Address to bind. Port 0 picks a free port.
    #[arg(long, default_value = "127.0.0.1:0")]
    address: SocketAddr,

    /// Dimension every vector and query must have.
    #[arg(long, default_value_t = VECTOR_DIMENSION)]
    dimension: usize,

    /// Fail every Nth request with 503 (0 disables).
    #[arg(long, default_value_t = 0)]
    fail_every: u64,

    /// Fixed latency added to every request, in milliseconds.
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        address: args.address,
        dimension: args.dimension,
        fail_every: args.fail_every,
        latency: Duration::from_millis(args.latency_ms),
    };

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Print "Listening on <addr>" once the server signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            println!("Listening on {}", addr);
        }
    });

    Server::new(config).run(ready_tx).await?;
    Ok(())
}
