// src/main.rs
//! NMEA Publisher - republishes boat navigation state as NMEA-0183 over UDP

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use nmea_publisher::{BoatdClient, ErrorPolicy, PublisherConfig, TelemetryPublisher};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "nmea-publisher")]
#[command(about = "Publish boat navigation state as NMEA-0183 sentences over UDP")]
struct Cli {
    /// Config file [default: ~/.config/nmea-publisher/config.json]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host that receives the NMEA datagrams
    #[arg(long)]
    host: Option<String>,

    /// UDP port that receives the NMEA datagrams
    #[arg(short, long)]
    port: Option<u16>,

    /// Boat-control service host
    #[arg(long)]
    boat_host: Option<String>,

    /// Boat-control service port
    #[arg(long)]
    boat_port: Option<u16>,

    /// Seconds between publishing cycles
    #[arg(short, long)]
    interval: Option<f64>,

    /// Keep publishing when a cycle fails instead of exiting
    #[arg(long)]
    continue_on_error: bool,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,

    /// Log every sentence sent
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Apply command line overrides on top of the file configuration
    fn apply(&self, config: &mut PublisherConfig) {
        if self.host.is_some() || self.port.is_some() {
            let host = self.host.clone().unwrap_or_else(|| config.udp_host.clone());
            config.update_destination(host, self.port.unwrap_or(config.udp_port));
        }
        if self.boat_host.is_some() || self.boat_port.is_some() {
            let host = self.boat_host.clone().unwrap_or_else(|| config.boat_host.clone());
            config.update_boat_service(host, self.boat_port.unwrap_or(config.boat_port));
        }
        if let Some(seconds) = self.interval {
            config.update_interval_secs(seconds);
        }
        if self.continue_on_error {
            config.error_policy = ErrorPolicy::Continue;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => PublisherConfig::get_config_path().context("unable to locate config file")?,
    };
    let mut config = PublisherConfig::load_from(&config_path)
        .with_context(|| format!("unable to load {}", config_path.display()))?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    if cli.save_config {
        config
            .save_to(&config_path)
            .with_context(|| format!("unable to save {}", config_path.display()))?;
        info!("Saved configuration to {}", config_path.display());
    }

    let mut client = BoatdClient::connect(&config.boat_host, config.boat_port, config.wind_speed_unit)
        .await
        .context("could not reach the boat-control service")?
        .with_reply_timeout(config.boat_timeout());

    let publisher = TelemetryPublisher::bind(config)
        .await
        .context("could not open UDP socket")?;
    publisher.stop_on_ctrl_c();

    publisher.run(&mut client).await.context("publishing stopped")?;

    info!("Shutting down...");
    Ok(())
}
