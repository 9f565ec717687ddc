//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use url::Url;

use crate::constants::{
    DEFAULT_ANALYSIS_MODEL, DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_IMAGE_WIDTH, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_SESSION_TTL_SECS, DEFAULT_STALE_AFTER_SECS,
};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "SCALPSCAN_DEBUG")]
    /// Enable debug logging. Env: SCALPSCAN_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "SCALPSCAN_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: SCALPSCAN_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "SCALPSCAN_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: SCALPSCAN_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    /// Upstream model API key. Without it every analysis fails with a missing-credential error.
    /// Env: GEMINI_API_KEY
    pub api_key: Option<String>,
    #[clap(long, default_value = DEFAULT_API_BASE, env = "SCALPSCAN_API_BASE")]
    /// Upstream API root.
    /// Env: SCALPSCAN_API_BASE
    pub api_base: Url,
    #[clap(long, default_value = DEFAULT_ANALYSIS_MODEL, env = "SCALPSCAN_ANALYSIS_MODEL")]
    /// Model used for the assessment.
    pub analysis_model: String,
    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "SCALPSCAN_IMAGE_MODEL")]
    /// Model used for the preview image.
    pub image_model: String,

    #[clap(long, default_value_t = DEFAULT_MAX_RETRIES)]
    /// Retries after a quota error.
    pub max_retries: u32,
    #[clap(long, default_value_t = DEFAULT_RETRY_BASE_DELAY_MS)]
    /// First retry delay in milliseconds, doubled on each retry.
    pub retry_base_delay_ms: u64,
    #[clap(long, default_value_t = DEFAULT_MAX_IMAGE_WIDTH)]
    /// Uploads wider than this are scaled down.
    pub max_image_width: u32,
    #[clap(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    /// JPEG quality for re-encoded uploads.
    pub jpeg_quality: u8,
    #[clap(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    #[clap(long, default_value_t = DEFAULT_STALE_AFTER_SECS)]
    /// Seconds after which an unfinished request no longer blocks its session.
    pub stale_after_secs: i64,
    #[clap(long, default_value_t = DEFAULT_SESSION_TTL_SECS, value_parser = clap::value_parser!(i64).range(1..))]
    /// Seconds of inactivity after which a session is forgotten.
    pub session_ttl_secs: i64,
}
