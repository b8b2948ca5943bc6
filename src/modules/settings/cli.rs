// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::{builder::ValueParser, Parser};
use std::{sync::LazyLock, time::Duration};
use url::Url;

use crate::modules::utils::join_endpoint;

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "actionrelay",
    about = "Offline action queue that batches user actions and delivers them to a telemetry endpoint,
    keeping undelivered actions in a local task store and retrying them on a schedule.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// relay log level (default: "info")
    #[clap(long, default_value = "info", env, help = "Set the log level for actionrelay")]
    pub relay_log_level: String,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub relay_ansi_logs: bool,

    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub relay_log_to_file: bool,

    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of server log files"
    )]
    pub relay_max_server_log_files: usize,

    #[clap(
        long,
        default_value = "15830",
        env,
        help = "Set the HTTP port for the operator API"
    )]
    pub relay_http_port: u16,

    #[clap(
        long,
        env,
        default_value = "0.0.0.0",
        help = "The IPv4 address the operator API binds to",
        value_parser = ValueParser::new(|s: &str| {
            if s.parse::<std::net::Ipv4Addr>().is_err() {
                return Err("The bind IP address must be a valid IPv4 address.".to_string());
            }
            Ok(s.to_string())
        })
    )]
    pub relay_bind_ip: String,

    #[clap(
        long,
        env,
        default_value = "./relay_data",
        help = "Set the data directory holding the task database and log files"
    )]
    pub relay_root_dir: String,

    #[clap(
        long,
        env,
        default_value = "tasks.db",
        help = "Set the file name of the task database inside the data directory",
        value_parser = ValueParser::new(|s: &str| {
            if s.trim().is_empty() || s.contains('/') || s.contains('\\') {
                return Err("The database name must be a plain, non-empty file name.".to_string());
            }
            Ok(s.to_string())
        })
    )]
    pub relay_db_name: String,

    /// Skips the embedded database entirely and keeps tasks in memory only.
    #[clap(
        long,
        env,
        default_value = "false",
        help = "Keep deferred tasks in memory only (tasks are lost on restart)"
    )]
    pub relay_storage_memory_mode: bool,

    #[clap(
        long,
        env,
        default_value = "https://5695pjsso7.execute-api.us-east-1.amazonaws.com/v1",
        help = "Base URL of the remote API receiving actions",
        value_parser = ValueParser::new(|s: &str| -> Result<String, String> {
            Url::parse(s).map_err(|_| format!("Invalid URL for api endpoint: {}", s))?;
            Ok(s.to_string())
        })
    )]
    pub relay_api_endpoint: String,

    #[clap(
        long,
        env,
        default_value = "/actions",
        help = "Path of the telemetry endpoint, relative to the API endpoint"
    )]
    pub relay_telemetry_path: String,

    #[clap(
        long,
        env,
        default_value = "/like",
        help = "Path of the like endpoint, relative to the API endpoint"
    )]
    pub relay_like_path: String,

    #[clap(
        long,
        env,
        default_value = "/unlike",
        help = "Path of the unlike endpoint, relative to the API endpoint"
    )]
    pub relay_unlike_path: String,

    #[clap(
        long,
        env,
        default_value = "10",
        help = "Timeout in seconds for a single delivery request",
        value_parser = clap::value_parser!(u64).range(1..=120)
    )]
    pub relay_delivery_timeout_secs: u64,

    #[clap(
        long,
        env,
        default_value = "3",
        help = "Number of actions collected before a batch is flushed",
        value_parser = ValueParser::new(|s: &str| {
            let value = s
                .parse::<usize>()
                .map_err(|_| format!("Invalid batch size: {}", s))?;
            if value < 1 {
                return Err("Batch size must be at least 1.".to_string());
            }
            Ok(value)
        })
    )]
    pub relay_batch_max_size: usize,

    #[clap(
        long,
        env,
        default_value = "60000",
        help = "Interval in milliseconds between scheduler ticks (minimum: 1000)",
        value_parser = clap::value_parser!(u64).range(1000..)
    )]
    pub relay_scheduler_interval_ms: u64,

    #[clap(
        long,
        env,
        default_value = "3",
        help = "Number of failed attempts after which a task is dead-lettered",
        value_parser = clap::value_parser!(u32).range(1..=100)
    )]
    pub relay_max_retries: u32,

    #[clap(
        long,
        env,
        default_value = "false",
        help = "Also send likes and unlikes to their dedicated endpoints as they happen"
    )]
    pub relay_like_sync_enabled: bool,

    #[clap(
        long,
        env,
        default_value = "3",
        help = "In-process attempts for a like/unlike before it is deferred to the task store",
        value_parser = clap::value_parser!(u32).range(1..=10)
    )]
    pub relay_like_sync_attempts: u32,

    #[clap(
        long,
        env,
        default_value = "1000",
        help = "Base delay in milliseconds of the like/unlike exponential backoff"
    )]
    pub relay_like_sync_base_delay_ms: u64,

    #[clap(
        long,
        env,
        help = "Interval in seconds between purges of completed tasks (disabled when unset)",
        value_parser = clap::value_parser!(u64).range(60..)
    )]
    pub relay_purge_interval_secs: Option<u64>,
}

impl Settings {
    pub fn telemetry_url(&self) -> String {
        join_endpoint(&self.relay_api_endpoint, &self.relay_telemetry_path)
    }

    pub fn like_url(&self) -> String {
        join_endpoint(&self.relay_api_endpoint, &self.relay_like_path)
    }

    pub fn unlike_url(&self) -> String {
        join_endpoint(&self.relay_api_endpoint, &self.relay_unlike_path)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_delivery_timeout_secs)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.relay_scheduler_interval_ms)
    }

    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            relay_log_level: "info".to_string(),
            relay_ansi_logs: false,
            relay_log_to_file: false,
            relay_max_server_log_files: 5,
            relay_http_port: 15830,
            relay_bind_ip: "127.0.0.1".into(),
            relay_root_dir: std::env::temp_dir()
                .join("actionrelay_test_data")
                .to_string_lossy()
                .into_owned(),
            relay_db_name: "tasks.db".into(),
            relay_storage_memory_mode: true,
            relay_api_endpoint: "http://127.0.0.1:9/v1".into(),
            relay_telemetry_path: "/actions".into(),
            relay_like_path: "/like".into(),
            relay_unlike_path: "/unlike".into(),
            relay_delivery_timeout_secs: 10,
            relay_batch_max_size: 3,
            relay_scheduler_interval_ms: 60000,
            relay_max_retries: 3,
            relay_like_sync_enabled: false,
            relay_like_sync_attempts: 3,
            relay_like_sync_base_delay_ms: 10,
            relay_purge_interval_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_joined_to_the_api_base() {
        assert_eq!(SETTINGS.telemetry_url(), "http://127.0.0.1:9/v1/actions");
        assert_eq!(SETTINGS.like_url(), "http://127.0.0.1:9/v1/like");
        assert_eq!(SETTINGS.unlike_url(), "http://127.0.0.1:9/v1/unlike");
    }

    #[test]
    fn defaults_match_the_documented_configuration() {
        let settings = Settings::parse_from(["actionrelay"]);
        assert_eq!(settings.relay_batch_max_size, 3);
        assert_eq!(settings.relay_max_retries, 3);
        assert_eq!(settings.scheduler_interval(), Duration::from_secs(60));
        assert_eq!(settings.delivery_timeout(), Duration::from_secs(10));
        assert_eq!(settings.relay_db_name, "tasks.db");
        assert!(settings.relay_purge_interval_secs.is_none());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let result = Settings::try_parse_from(["actionrelay", "--relay-batch-max-size", "0"]);
        assert!(result.is_err());
    }
}
