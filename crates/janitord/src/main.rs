//! janitord - Deis node janitor
//!
//! Periodically removes images of application versions that fell out of the
//! retention window, untagged and git-tagged build images, and exited
//! containers. Configured through flags or their environment variables;
//! see `janitord --help`.

mod cli;
mod schedule;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use docker_runtime::DockerRuntime;
use etcd_registry::EtcdClient;
use janitor_core::{init_tracing, Janitor, RegistryClient};
use tracing::{error, info, warn};

use crate::cli::Cli;

/// Connect fresh clients and run one reconcile pass.
///
/// Connection problems are logged and end the pass early; they never stop
/// the daemon.
async fn run_pass(cli: &Cli) {
    let runtime = match DockerRuntime::connect(&cli.docker_config()).await {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, url = %cli.docker_url, "unable to connect to docker, skipping pass");
            return;
        }
    };

    let mut janitor = match Janitor::new(Arc::new(runtime), cli.janitor_config()) {
        Ok(janitor) => janitor,
        Err(e) => {
            error!(error = %e, "invalid janitor configuration, skipping pass");
            return;
        }
    };

    if let Some(etcd_config) = cli.etcd_config() {
        match EtcdClient::new(etcd_config) {
            Ok(client) => {
                let registry: Arc<dyn RegistryClient> = Arc::new(client);
                janitor = janitor.with_registry(registry);
            }
            Err(e) => {
                error!(error = %e, "unable to build etcd client, skipping pass");
                return;
            }
        }
    }

    janitor.run().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.level());

    info!(
        mode = if cli.cp_node { "registry-less" } else { "registry" },
        delete_images = cli.delete_images,
        delete_containers = cli.delete_containers,
        version_max_count = cli.version_max_count,
        "janitord starting"
    );

    for setting in cli.ignored_settings() {
        warn!(setting, "setting is not supported and will be ignored");
    }

    if cli.run_once {
        info!("running in RUN_ONCE mode (execute one iteration and exit)");
        run_pass(&cli).await;
        info!("RUN_ONCE operation finished, exiting");
        return Ok(());
    }

    let schedule = cli.cron_fields().schedule()?;
    schedule::run_on_schedule(&schedule, schedule::shutdown_signal(), || run_pass(&cli)).await;
    Ok(())
}
