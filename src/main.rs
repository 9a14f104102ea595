use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, ensure};
use btleplug::api::Manager as _;
use btleplug::platform::Manager;
use clap::{Parser, Subcommand};
use log::info;

mod advertisement;
mod beacon;
mod broadcaster;
mod config;
mod manager;
mod messages;
mod mqtt;
mod presence;
mod scanner;

#[derive(Parser)]
#[command(about = "Broadcast an iBeacon identity, or watch for one and publish presence over MQTT")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch for the configured beacon and announce presence transitions
    Monitor,
    /// Advertise the configured beacon until interrupted
    Broadcast,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let config_contents = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    let config: config::AppConfig = toml::de::from_str(&config_contents)?;

    match cli.command {
        Command::Monitor => monitor(config).await,
        Command::Broadcast => broadcast(config).await,
    }
}

async fn monitor(config: config::AppConfig) -> anyhow::Result<()> {
    let identity = config.beacon.identity()?;
    let scan = config.scan.clone().unwrap_or_default();
    ensure!(scan.grace_period() > 0, "scan.grace_period must be at least 1");

    let (mqtt_client, eventloop) = mqtt::MqttClient::new(&config.mqtt);
    mqtt_client.subscribe().await?;

    let bt_manager = Manager::new().await?;

    // get the first bluetooth adapter
    let adapters = bt_manager.adapters().await?;
    let central = adapters
        .into_iter()
        .next()
        .context("no Bluetooth adapter available")?;

    let scanner = scanner::Scanner::new(identity, scan.company_ids(), scan.match_policy());
    let tracker = presence::PresenceTracker::new(scan.grace_period());

    let core = manager::Manager::new(
        central,
        mqtt_client,
        eventloop,
        scanner,
        tracker,
        config.beacon.display_name(),
        scan.scan_cycle(),
    );
    core.run_loop().await
}

async fn broadcast(config: config::AppConfig) -> anyhow::Result<()> {
    let identity = config.beacon.identity()?;
    let advertise = config.advertise.clone().unwrap_or_default();

    let payload = advertisement::encode(&identity, advertise.calibrated_power());

    let mut broadcaster = broadcaster::Broadcaster::new().await?;
    broadcaster
        .start(
            advertise.manufacturer_code(),
            payload,
            advertise.local_name.clone(),
        )
        .await?;
    info!("Broadcasting beacon {}; press ctrl-c to stop", identity);

    tokio::signal::ctrl_c().await?;

    broadcaster.stop();
    // give bluez a moment to withdraw the advertisement
    tokio::time::sleep(Duration::from_secs(1)).await;

    Ok(())
}
