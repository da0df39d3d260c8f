//! recall - Entry point for the conversation memory CLI

use clap::Parser;

use recall::app::{App, Cli};
use recall::config::Settings;

#[tokio::main]
async fn main() {
    // Initialize logging; stderr keeps stdout clean for JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load_or_default();
    let app = App::bootstrap(&settings).await?;
    app.run(cli.command).await
}
