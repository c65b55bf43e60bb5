use anyhow::Result;
use clap::Parser;
use netops_sentinel::cli::CliArgs;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = CliArgs::parse();
    netops_sentinel::run(args).await
}
