use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use sonos_group_manager::logging::{init_logging, LoggingMode};
use sonos_group_manager::{
    CliArgs, GroupManager, GroupManagerConfig, ManagerError, PidLock, SonosNetwork, ZoneControl,
};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config = args.into_config().context("Invalid configuration")?;
    init_logging(LoggingMode::from_enabled(config.enable_logging))?;

    let _lock = PidLock::acquire(&config.pid_file())?;

    let devices = sonos_control::discover(
        sonos_control::SoapClient::new().agent(),
        config.discovery_timeout,
    )
    .context("Zone discovery failed")?;
    if devices.is_empty() {
        return Err(ManagerError::NoZonesDiscovered.into());
    }
    for device in &devices {
        info!(ip = %device.ip, name = %device.name, model = %device.model_name, "Found zone");
    }

    let network = Arc::new(
        SonosNetwork::connect(&devices, &config).context("Failed to connect to the Sonos network")?,
    );
    info!(zones = ?network.zones(), callback_url = network.callback_url(), "Connected");

    let control: Arc<dyn ZoneControl> = network.clone();
    let mut manager = GroupManager::new(network.zones(), &config, control, network.as_ref())
        .context("Failed to subscribe to zone events")?;

    run_loop(&mut manager, &config)
}

fn run_loop(manager: &mut GroupManager, config: &GroupManagerConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("Failed to install signal handler")?;

    while running.load(Ordering::SeqCst) {
        manager.poll();
        std::thread::sleep(config.tick_interval);
    }

    info!("Interrupted, exiting");
    Ok(())
}
