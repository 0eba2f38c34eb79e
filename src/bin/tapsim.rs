//! TCP front end for the simulated test bench: serves the ATE session
//! protocol (STARTSIM/MW/MR/STOPSIM/EXIT) on a listening socket.

use std::net::TcpListener;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tapsim", about = "Serve the ATE session protocol over TCP")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:2542")]
    listen: String,
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let listener = TcpListener::bind(&args.listen)?;
    tracing::info!(addr = %args.listen, "listening");
    jtag_ate::session::serve(&listener)
}
