use std::error::Error;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries the first article only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli.to_options();
    info!(mode = %options.target(), limit = options.limit, "hn-scrape starting up");

    let result = hn_extract::scrape(&options).await?;

    output::write_json(&cli.output, &result)?;
    info!(
        articles = result.article_count,
        path = %cli.output.display(),
        "Wrote scrape result"
    );

    if let Some(first) = result.articles.first() {
        println!("{}", serde_json::to_string_pretty(first)?);
    }

    Ok(())
}
