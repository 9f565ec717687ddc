use clap::Parser;
use scalpscan::config::setup_logging;
use scalpscan::gateway::{GatewayClient, GatewayConfig};
use scalpscan::web::AppState;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = scalpscan::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let config = GatewayConfig::from(&cli);
    if config.api_key.is_none() {
        error!("No API key configured (GEMINI_API_KEY); analysis and preview requests will fail");
    }

    let gateway = match GatewayClient::new(config) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("Failed to build gateway client: {}", err);
            return;
        }
    };

    if let Err(err) = scalpscan::web::setup_server(
        &cli.listen_address,
        cli.port,
        AppState::new(gateway, cli.stale_after_secs).with_session_ttl(cli.session_ttl_secs),
        cli.max_body_bytes,
    )
    .await
    {
        error!("Application error: {}", err);
    }
}
