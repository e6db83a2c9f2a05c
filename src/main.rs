use clap::Parser;
use resume_ats_scorer::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Analyze(args) => cli::analyze::run(args).await,
        Command::Models(args) => cli::models::run(args),
    }
}
