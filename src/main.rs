#[macro_use]
extern crate log;

mod broker_offsets;
mod cli;
mod constants;
mod consumer_offsets;
mod http;
mod kafka_client;
mod kafka_types;
mod lag_reporter;
mod logging;
mod metrics_sink;
mod monitor;
mod offset_codec;
mod prometheus_metrics;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = parse_cli_and_init_logging();

    let shutdown_token = build_shutdown_token();

    // Init `prometheus` Registry
    let metrics = Arc::new(prometheus_metrics::init());

    // Connect to Kafka and StatsD: failing either is fatal
    let monitor = match monitor::init(
        cli.build_client_config(),
        &cli.statsd_addr,
        cli.statsd_prefix.clone(),
        shutdown_token.clone(),
        metrics.clone(),
    )
    .await
    {
        Ok(m) => m,
        Err(e) => {
            error!("{e}");
            std::process::exit(exit_code::SERVICE_UNAVAILABLE);
        },
    };

    // Serve self-instrumentation over HTTP
    let http_server = tokio::spawn(http::init(cli.listen_on(), shutdown_token.clone(), metrics));

    // Returns only once shutdown is requested
    monitor.run(cli.read_interval()).await;

    if let Err(e) = http_server.await {
        error!("HTTP server task failed: {e}");
    }

    info!("Shutdown complete");
    std::process::exit(exit_code::SUCCESS);
}

fn parse_cli_and_init_logging() -> Cli {
    // Parse command line input and initialize logging
    let cli = Cli::parse_and_validate();
    logging::init(cli.verbosity_level());

    trace!("Created:\n{:#?}", cli);

    cli
}

fn build_shutdown_token() -> CancellationToken {
    let shutdown_token = CancellationToken::new();

    // Setup shutdown signal handler:
    // when it's time to shutdown, cancel the token that every part of the system watches.
    //
    // NOTE: This handler will be listening on its own dedicated thread.
    let handler_token = shutdown_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutting down...");
        handler_token.cancel();
    }) {
        error!("Failed to register signal handler: {e}");
    }

    shutdown_token
}
