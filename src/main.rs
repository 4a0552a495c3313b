use anyhow::Result;
use clap::Parser;
use pandoc_batch::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run().await
}
