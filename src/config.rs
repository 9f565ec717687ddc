//! Config handling

use std::time::Duration;

use tracing::log::LevelFilter;

use crate::cli::CliOptions;
use crate::gateway::{GatewayConfig, RetryPolicy};
use crate::imaging::PreprocessOptions;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("tower_sessions", LevelFilter::Warn)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

impl From<&CliOptions> for GatewayConfig {
    fn from(cli: &CliOptions) -> Self {
        let mut config = GatewayConfig::new(cli.api_key.clone(), cli.api_base.clone());
        config.analysis_model = cli.analysis_model.clone();
        config.image_model = cli.image_model.clone();
        config.retry = RetryPolicy {
            max_retries: cli.max_retries,
            base_delay: Duration::from_millis(cli.retry_base_delay_ms),
        };
        config.preprocess = PreprocessOptions {
            max_width: cli.max_image_width,
            jpeg_quality: cli.jpeg_quality,
        };
        config
    }
}
