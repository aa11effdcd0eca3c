use anyhow::Result;
use clap::Parser;
use ds_tutor::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    ds_tutor::run(args).await
}
