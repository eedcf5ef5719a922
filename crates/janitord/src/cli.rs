//! Command-line and environment configuration.
//!
//! Every option can also be set through the environment variable named in
//! its `env` attribute, which is how the janitor is configured when it runs
//! as a unit on each cluster node.

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use docker_runtime::DockerConfig;
use etcd_registry::EtcdConfig;
use janitor_core::{JanitorConfig, LogFormat};
use tracing::Level;

use crate::schedule::CronFields;

#[derive(Parser, Debug)]
#[command(name = "janitord")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Removes stale images and exited containers from a Deis node",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log line format: json or text
    #[arg(long, env = "FORMATTER", default_value = "json")]
    pub log_format: LogFormat,

    /// Field list from older deployments' LOG_FORMAT. Unsupported: the JSON
    /// layout is fixed; use --verbose or RUST_LOG to change what is logged
    #[arg(long, env = "LOG_FORMAT", hide_env_values = true)]
    pub log_fields: Option<String>,

    /// Execute one pass and exit instead of following the schedule
    #[arg(long, env = "RUN_ONCE", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub run_once: bool,

    /// Control-plane node: no registry, clean images by protect-list only
    #[arg(long, env = "CP_NODE", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub cp_node: bool,

    /// Actually delete images (otherwise only log what would go)
    #[arg(long, env = "DELETE_IMAGES", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub delete_images: bool,

    /// Actually delete exited containers (otherwise only log what would go)
    #[arg(long, env = "DELETE_CONTAINERS", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub delete_containers: bool,

    /// Versions kept per application, the running one included
    #[arg(long, env = "VERSION_MAX_COUNT", default_value_t = 3)]
    pub version_max_count: u64,

    /// etcd host
    #[arg(long, env = "ETCD_HOST", default_value = "127.0.0.1")]
    pub etcd_host: String,

    /// etcd client port
    #[arg(long, env = "ETCD_PORT", default_value_t = 4001)]
    pub etcd_port: u16,

    /// Docker daemon endpoint
    #[arg(long, env = "DOCKER_URL", default_value = "unix:///var/run/docker.sock")]
    pub docker_url: String,

    /// Docker API version, or `auto` to negotiate
    #[arg(long, env = "DOCKER_VERSION", default_value = "auto")]
    pub docker_version: String,

    /// Docker request timeout in seconds
    #[arg(long, env = "DOCKER_TIMEOUT", default_value_t = 300)]
    pub docker_timeout: u64,

    /// Cron day-of-month field
    #[arg(long, env = "CRON_DAY", default_value = "*")]
    pub cron_day: String,

    /// Cron day-of-week field (names such as mon-fri are safest)
    #[arg(long, env = "CRON_DAY_OF_WEEK", default_value = "*")]
    pub cron_day_of_week: String,

    /// Cron hour field
    #[arg(long, env = "CRON_HOUR", default_value = "*")]
    pub cron_hour: String,

    /// Cron minute field
    #[arg(long, env = "CRON_MINUTE", default_value = "0")]
    pub cron_minute: String,

    /// ISO week field. Unsupported: cron schedules have no week field
    #[arg(long, env = "CRON_WEEK")]
    pub cron_week: Option<String>,
}

impl Cli {
    pub fn level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Settings that are accepted for compatibility but have no effect.
    pub fn ignored_settings(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.log_fields.is_some() {
            ignored.push("LOG_FORMAT");
        }
        if self.cron_week.is_some() {
            ignored.push("CRON_WEEK");
        }
        ignored
    }

    pub fn janitor_config(&self) -> JanitorConfig {
        JanitorConfig::default()
            .with_retention_window(self.version_max_count)
            .with_image_deletion(self.delete_images)
            .with_container_deletion(self.delete_containers)
    }

    /// `None` on control-plane nodes, which have no registry.
    pub fn etcd_config(&self) -> Option<EtcdConfig> {
        if self.cp_node {
            return None;
        }
        Some(EtcdConfig::new(&self.etcd_host).with_port(self.etcd_port))
    }

    pub fn docker_config(&self) -> DockerConfig {
        DockerConfig {
            url: self.docker_url.clone(),
            api_version: self.docker_version.clone(),
            timeout_secs: self.docker_timeout,
        }
    }

    pub fn cron_fields(&self) -> CronFields {
        CronFields {
            minute: self.cron_minute.clone(),
            hour: self.cron_hour.clone(),
            day: self.cron_day.clone(),
            day_of_week: self.cron_day_of_week.clone(),
        }
    }
}
