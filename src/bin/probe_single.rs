use fallback_probe::config::{self, ProbeConfig};
use fallback_probe::dispatch::http::ChatClient;
use fallback_probe::report;
use fallback_probe::single::SingleProbe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = config::load_dotenv();
    fallback_probe::logging::init();
    config::log_dotenv(&dotenv);

    let config = ProbeConfig::from_environment()?;
    tracing::info!(?config, "probe-single starting");

    println!("{}", report::single_banner(&config));

    let result = match ChatClient::new(&config) {
        Ok(client) => SingleProbe::new(client, &config).run().await,
        Err(e) => Err(e),
    };

    // Failure is reported, not signalled through the exit status.
    match result {
        Ok(response) => println!("{}", report::render_single_success(&response)),
        Err(e) => {
            println!("{}", report::render_single_failure(&e));
            eprintln!("{}", report::render_error_trace(&e));
        }
    }

    Ok(())
}
