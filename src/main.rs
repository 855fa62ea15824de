use std::env;
use std::path::PathBuf;

use anyhow::Result;
use skydash::{SkydashConfig, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = env::var_os("SKYDASH_CONFIG_FILE").map(PathBuf::from);
    let config = SkydashConfig::load_from_path(config_path)?;

    telemetry::init(&config.logging)?;
    tracing::info!("Starting skydash {}", skydash::VERSION);

    web::run(config).await
}
