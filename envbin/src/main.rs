//! envbin entry point

use chrono::Utc;
use clap::Parser;
use shared::{InstanceId, logging};
use std::sync::Arc;
use tokio::signal;

use envbin::{
    Args, FaultResult, FaultServer,
    core::{AllocationPool, CpuLoadGenerator, SettingsStore},
};

#[tokio::main]
async fn main() -> FaultResult<()> {
    let args = Args::parse();

    // Initialize instance identity before the first log line
    InstanceId::init("envbin");

    logging::init_tracing_with_level(Some(&args.log_level))?;

    let config = args.into_config()?;

    logging::log_startup(
        InstanceId::current(),
        &format!(
            "envbin {} on {} (cpu period {:?})",
            env!("CARGO_PKG_VERSION"),
            config.listen_addr,
            config.cpu_period
        ),
    );

    let settings = Arc::new(SettingsStore::new());
    config.initial.apply_to(&settings);
    let pool = Arc::new(AllocationPool::new());

    let cpu_load = CpuLoadGenerator::new(settings.clone(), config.cpu_period).start()?;

    let server = FaultServer::standard(settings, pool, Utc::now());

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => logging::log_shutdown(InstanceId::current(), "Received Ctrl+C signal"),
            Err(err) => {
                logging::log_error(InstanceId::current(), "Signal handling", &err);
                // Without a signal handler the server runs until killed
                std::future::pending::<()>().await;
            }
        }
    };

    let result = server.run(config.listen_addr, shutdown).await;

    // Workers finish their current period before exiting
    if let Err(e) = tokio::task::spawn_blocking(move || cpu_load.shutdown()).await {
        logging::log_error(InstanceId::current(), "CPU load shutdown", &e);
    }

    match &result {
        Ok(()) => logging::log_success(InstanceId::current(), "envbin stopped gracefully"),
        Err(e) => logging::log_error(InstanceId::current(), "Server", e),
    }
    result
}
