use clap::Parser;
use client::config::Cli;
use client::error::ClientError;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    client::init_tracing();
    client::run(Cli::parse()).await
}
