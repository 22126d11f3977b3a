//! rdesk-server entry point.
//!
//! ```text
//! rdesk-server                  Run in the foreground
//! rdesk-server --config <path>  Load a custom config TOML
//! rdesk-server --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rdesk_core::RemoteControlService;
use rdesk_server::config::ServerConfig;
use rdesk_server::hooks::ConsoleHooks;
use rdesk_server::platform;
use rdesk_server::service::RemoteServer;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rdesk-server", about = "rdesk remote-control server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rdesk-server.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = ServerConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rdesk-server v{}", env!("CARGO_PKG_VERSION"));
    info!("ports: {:?}", config.network.ports);
    info!("target height: {}", config.screen.target_height);
    info!("media directory: {}", config.storage.media_dir.display());

    let hooks = Arc::new(ConsoleHooks::new(config.session.password));
    info!("password: {:04}", hooks.password());

    let service = Arc::new(RemoteControlService::new(
        config.to_service_config(),
        hooks,
        platform::capture_backend(config.screen.monitor_index),
        platform::actuators(),
    ));

    let server = RemoteServer::new(config.network.clone(), Arc::clone(&service));
    let stop = server.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received; shutting down");
        stop.cancel();
    });

    let result = server.run().await;
    service.close().await;
    result?;

    Ok(())
}
