// src/main.rs
use clap::Parser;
use drops_miner_rs::{
    AuthConfig, Commands, LogSink, MinerError, MinerService, Settings, StandbyClient, WebApi,
    Watchdog, config, init_logging,
};
use tokio::runtime::Runtime;

/// Exit status when the settings file cannot be loaded
const EXIT_SETTINGS: i32 = 4;

/// Main entry point for the drops miner
///
/// # Flow
/// 1. Parses command line arguments and loads settings
/// 2. Initializes logging once for the whole process
/// 3. Runs the service until the client exits
/// 4. Exits with the client's status
fn main() {
    let cli = Commands::parse();

    let settings = match config::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            std::process::exit(EXIT_SETTINGS);
        }
    };
    if let Err(e) = init_logging(&settings.log_options()) {
        eprintln!("Logging not initialized: {}", e);
    }

    let status = match run(settings) {
        Ok(status) => status,
        Err(e) => {
            log::error!(target: LogSink::main().target(), "{}", e);
            1
        }
    };
    log::logger().flush();
    std::process::exit(status);
}

/// Runs the service with its watchdog and optional control API
///
/// # Returns
/// - `Ok(status)` - The client's exit status
/// - `Err(MinerError)` - If the runtime or the API listener fails to start
///
/// # Operations
/// 1. Creates the service around a standby client
/// 2. Starts the control API when `--bind` was given
/// 3. Spawns the watchdog
/// 4. Runs the client, then tears down the watchdog and the API
fn run(settings: Settings) -> Result<i32, MinerError> {
    let rt = Runtime::new()?;
    rt.block_on(async move {
        let bind = settings.bind().map(str::to_string);
        let service = MinerService::new(
            settings.into_shared(),
            StandbyClient::factory(),
            LogSink::main(),
        );

        let api = match bind {
            Some(bind) => {
                let api = WebApi::new(service.clone(), AuthConfig::from_env(), LogSink::api());
                api.start(&bind).await?;
                Some(api)
            }
            None => None,
        };

        let watchdog =
            Watchdog::new(service.state_store(), service.clone(), LogSink::watchdog()).spawn();

        let status = service.start().await;

        watchdog.shutdown().await;
        if let Some(api) = api {
            api.stop().await;
        }
        Ok(status)
    })
}
