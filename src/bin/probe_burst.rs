use std::sync::Arc;

use fallback_probe::burst::BurstExecutor;
use fallback_probe::classify::Tally;
use fallback_probe::config::{self, ProbeConfig};
use fallback_probe::dispatch::http::ChatClient;
use fallback_probe::report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = config::load_dotenv();
    fallback_probe::logging::init();
    config::log_dotenv(&dotenv);

    let config = Arc::new(ProbeConfig::from_environment()?);
    tracing::info!(?config, "probe-burst starting");

    let client = ChatClient::new(&config)?;

    println!("{}", report::render_burst_header(&config));

    let outcomes = BurstExecutor::new(client, config.clone()).execute().await;
    println!("{}", report::render_outcomes(&outcomes));

    let tally = Tally::from_outcomes(&outcomes, &config.providers);
    println!("{}", report::render_summary(&tally, &config.providers));

    Ok(())
}
