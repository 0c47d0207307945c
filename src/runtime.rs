use std::path::{Path, PathBuf};

use action_executor::ExecutorConfig;
use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    // stdout carries the command status, logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: ExecutorConfig,
    pub path: PathBuf,
}

pub fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/action-driver.yaml > ~/.config/action-driver/config.yaml
            let local_config = PathBuf::from("config/action-driver.yaml");
            if local_config.exists() {
                local_config
            } else {
                let mut path = dirs::config_dir().context("Failed to get config directory")?;
                path.push("action-driver");
                path.push("config.yaml");
                path
            }
        }
    };

    let config = if config_path.exists() {
        let config = ExecutorConfig::from_yaml_file(&config_path)
            .context("Failed to load config file")?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        ExecutorConfig::default()
    };

    let config = config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}

/// Read a file, or stdin when `path` is `-`.
pub async fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        use tokio::io::AsyncReadExt;
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
