//! embedded-ftpd - host entry point
//!
//! Runs the engine on a workstation: std sockets, a directory tree as the
//! filesystem, and a tokio interval as the scheduler.

use log::{error, info};

use embedded_ftpd::Server;
use embedded_ftpd::clock::SystemClock;
use embedded_ftpd::config::ServerConfig;
use embedded_ftpd::error::FtpServerError;
use embedded_ftpd::network::HostNetwork;
use embedded_ftpd::storage::HostFilesystem;
use embedded_ftpd::update::FileUpdateSink;

/// Volume created on first start so the root listing is never empty.
const DEFAULT_VOLUME: &str = "flash";

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    if let Err(e) = run().await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), FtpServerError> {
    let config = ServerConfig::load("config")?;

    let root = config.host.server_root_path();
    std::fs::create_dir_all(root.join(DEFAULT_VOLUME))?;
    info!("Serving volumes under {}", root.display());

    let net = HostNetwork::new(config.host.bind_address, config.host.advertise_address);
    let fs = HostFilesystem::new(root)?;
    let updater = FileUpdateSink::new(
        config.host.update_image_path.clone(),
        config.host.update_image_file.clone(),
    );

    let mut interval = tokio::time::interval(config.engine.cycle_time());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut server = Server::new(config.engine, net, fs, updater, SystemClock);
    server.enable();
    info!("Launching FTP server...");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => server.tick(),
            _ = &mut shutdown => {
                info!("Shutdown requested");
                server.disable();
                break;
            }
        }
    }

    Ok(())
}
