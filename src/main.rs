use agritwin::api::{ApiClient, MockTransport};
use agritwin::config::Config;
use agritwin::error::ConfigError;
use agritwin::{Dashboard, PollContext, SessionStore};
use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Command-line arguments for the AgriTwin dashboard
#[derive(Parser)]
#[command(
    name = "agritwin",
    about = "AgriTwin farm dashboard - live field, weather and irrigation panels in the terminal",
    long_about = "Polls the AgriTwin backend for every enabled dashboard panel on its own \
                  cadence and prints a plain-text snapshot of the dashboard at a fixed refresh rate."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Print one snapshot once every panel has settled, then exit
    #[arg(long)]
    once: bool,

    /// Seconds between printed snapshots
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    refresh_seconds: u64,

    /// Serve canned demo data instead of contacting the backend
    #[arg(long)]
    mock: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if self.refresh_seconds == 0 {
            return Err("--refresh-seconds must be greater than zero".to_string());
        }

        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Convert config path to string safely, handling non-UTF-8 paths
    ///
    /// # Returns
    ///
    /// `Ok(Some(path_str))` if config is provided and valid UTF-8,
    /// `Ok(None)` if no config provided,
    /// `Err(String)` if config path contains invalid UTF-8
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }

    fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds)
    }
}

/// Load configuration from file or use defaults
///
/// # Arguments
///
/// * `config_path` - Optional path to configuration file
///
/// # Returns
///
/// Loaded configuration, or the default configuration if the file is missing or invalid
fn load_config(config_path: Option<&str>) -> Config {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            match Config::from_file(std::path::Path::new(path)) {
                Ok(config) => config,
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path
                    );
                    Config::default()
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path, e);
                    warn!("Using default configuration due to invalid config file");
                    Config::default()
                }
            }
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    }
}

/// Canned reply served by `--mock`; carries every panel's fields at once
fn demo_payload() -> Value {
    json!({"data": {
        "analytics": {
            "iotData": {
                "lux": {"latestReading": 18250},
                "temperature": {"latestReading": 27.4},
                "humidity": {"latestReading": 61},
                "soilMoisture": {"latestReading": 34.5},
            },
        },
        "current": {
            "condition": "Partly cloudy",
            "temperature": 28,
            "humidity": 58,
            "windSpeed": 11.5,
            "rainfall": 0,
        },
        "pumpStatus": "ON",
        "flowRate": 35.5,
        "waterUsedToday": 1250,
        "nextScheduledRun": "05:30",
        "forecast": {
            "crop": "Maize",
            "expectedYield": 8.2,
            "unit": "t/ha",
            "confidence": 0.87,
            "harvestDate": "2027-03-15",
        },
        "tenants": [
            {"id": "north-orchard", "name": "North Orchard"},
            {"id": "river-fields", "name": "River Fields"},
        ],
    }})
}

/// Wait until every panel has settled once, or until shutdown is requested
///
/// # Returns
///
/// `true` if every panel settled, `false` if shutdown came first
async fn wait_until_settled(
    dashboard: &Dashboard,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let mut check = interval(Duration::from_millis(100));
    while !dashboard.all_settled() {
        tokio::select! {
            _ = check.tick() => {}
            _ = shutdown.changed() => return false,
        }
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting AgriTwin dashboard");

    cli.validate().map_err(anyhow::Error::msg)?;
    let config_path = cli.config_path_str().map_err(anyhow::Error::msg)?;

    let mut config = load_config(config_path);
    config.apply_env_overrides();
    config
        .validate()
        .context("Invalid configuration after applying environment overrides")?;

    let session = match config.credentials() {
        Some(credentials) => SessionStore::with_credentials(credentials),
        None => {
            warn!("No session configured; requests will be sent without Authorization");
            SessionStore::new()
        }
    };

    let client = if cli.mock {
        info!("Serving demo data (--mock)");
        ApiClient::new(Arc::new(MockTransport::json(demo_payload())))
    } else {
        ApiClient::http(config.request_timeout()).context("Failed to build HTTP client")?
    };

    let context = PollContext::new(client, Arc::new(session), config.service_urls())
        .with_overlap(config.polling.overlap);
    let mut dashboard =
        Dashboard::from_config(&config, context).context("Failed to mount dashboard")?;
    if dashboard.is_empty() {
        warn!("No panels enabled; nothing to poll");
    }

    let (shutdown_sender, mut shutdown_receiver) = watch::channel(false);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if shutdown_sender.send(true).is_err() {
            error!("Failed to send shutdown signal");
        }
    })
    .context("Error setting SIGINT handler for graceful shutdown")?;

    if cli.once {
        if wait_until_settled(&dashboard, &mut shutdown_receiver).await {
            print!("{}", dashboard.render());
        } else {
            info!("Interrupted before every panel settled; no snapshot printed");
        }
    } else {
        info!("AgriTwin dashboard is running. Press Ctrl+C to stop.");
        let mut refresh = interval(cli.refresh_interval());
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = refresh.tick() => println!("{}", dashboard.render()),
                _ = shutdown_receiver.changed() => break,
            }
        }
    }

    dashboard.unmount();
    info!("AgriTwin dashboard shutdown complete");
    Ok(())
}
