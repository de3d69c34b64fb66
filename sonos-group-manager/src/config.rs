//! Runtime configuration
//!
//! Every option can be given on the command line or through its
//! `SONOS_GM_*` environment variable; the flag wins when both are set.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::error::{ManagerError, Result};

/// Name of the singleton lock file inside `pid_file_path`
pub const PID_FILE_NAME: &str = "sonos-group-manager.pid";

/// Longest accepted revert delay (one year)
pub const MAX_REVERT_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupManagerConfig {
    /// Quiet period between full idleness and reverting to the default grouping
    /// Default: 5 seconds
    pub revert_delay: Duration,

    /// Verbose tracing to stdout
    /// Default: false
    pub enable_logging: bool,

    /// Track soundbars in passthrough mode and re-merge their groups
    /// Default: true
    pub playbar_rejoin_group_on_play: bool,

    /// Directory holding the singleton lock file
    /// Default: the system temp directory
    pub pid_file_path: PathBuf,

    /// Poll loop period
    /// Default: 1 second
    pub tick_interval: Duration,

    /// How long to wait for SSDP answers
    /// Default: 3 seconds
    pub discovery_timeout: Duration,

    /// Ports tried, in order, for the NOTIFY callback server
    /// Default: (3400, 3500)
    pub callback_port_range: (u16, u16),

    /// Timeout requested for event subscriptions
    /// Default: 1800 seconds
    pub subscription_timeout: Duration,
}

impl Default for GroupManagerConfig {
    fn default() -> Self {
        Self {
            revert_delay: Duration::from_secs(5),
            enable_logging: false,
            playbar_rejoin_group_on_play: true,
            pid_file_path: std::env::temp_dir(),
            tick_interval: Duration::from_millis(1000),
            discovery_timeout: Duration::from_secs(3),
            callback_port_range: (3400, 3500),
            subscription_timeout: Duration::from_secs(1800),
        }
    }
}

impl GroupManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full path of the singleton lock file
    pub fn pid_file(&self) -> PathBuf {
        self.pid_file_path.join(PID_FILE_NAME)
    }

    pub fn validate(&self) -> Result<()> {
        if self.revert_delay > MAX_REVERT_DELAY {
            return Err(ManagerError::Configuration(format!(
                "Revert delay must not exceed {} seconds",
                MAX_REVERT_DELAY.as_secs()
            )));
        }

        if self.tick_interval.is_zero() {
            return Err(ManagerError::Configuration(
                "Tick interval must be greater than 0".to_string(),
            ));
        }

        if self.discovery_timeout.is_zero() {
            return Err(ManagerError::Configuration(
                "Discovery timeout must be greater than 0".to_string(),
            ));
        }

        if self.callback_port_range.0 > self.callback_port_range.1 {
            return Err(ManagerError::Configuration(
                "Invalid callback port range: start must not exceed end".to_string(),
            ));
        }

        if self.subscription_timeout.as_secs() == 0 || self.subscription_timeout.as_secs() > u64::from(u32::MAX) {
            return Err(ManagerError::Configuration(
                "Subscription timeout must be between 1 and 4294967295 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Keeps a Sonos household in its default grouping
///
/// Group zones with everything paused to set the default. Regroup while
/// something plays for a temporary grouping; it is reverted once all zones
/// have stopped for the revert delay.
#[derive(Parser, Debug, Clone)]
#[command(name = "sonos-group-manager", version)]
pub struct CliArgs {
    /// Seconds between full idleness and reverting to the default grouping
    #[arg(long, env = "SONOS_GM_REVERT_DELAY", default_value_t = 5, value_name = "SECONDS")]
    pub revert_delay: u64,

    /// Verbose tracing to stdout (0/1, true/false, yes/no, on/off)
    #[arg(
        long,
        env = "SONOS_GM_ENABLE_LOGGING",
        default_value = "0",
        num_args = 0..=1,
        default_missing_value = "1",
        value_parser = parse_flag,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    pub enable_logging: bool,

    /// Re-merge a soundbar's group when it leaves TV passthrough
    #[arg(
        long,
        env = "SONOS_GM_PLAYBAR_REJOIN_GROUP_ON_PLAY",
        default_value = "1",
        num_args = 0..=1,
        default_missing_value = "1",
        value_parser = parse_flag,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    pub playbar_rejoin_group_on_play: bool,

    /// Directory for the singleton PID file [default: system temp dir]
    #[arg(long, env = "SONOS_GM_PID_FILE_PATH", value_name = "DIR")]
    pub pid_file_path: Option<PathBuf>,

    /// Poll loop period in milliseconds
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    pub tick_interval: u64,

    /// Discovery timeout in seconds
    #[arg(long, default_value_t = 3, value_name = "SECONDS")]
    pub discovery_timeout: u64,

    /// Port range for the event callback server
    #[arg(long, default_value = "3400-3500", value_parser = parse_port_range, value_name = "START-END")]
    pub callback_ports: (u16, u16),

    /// Requested event subscription timeout in seconds
    #[arg(long, default_value_t = 1800, value_name = "SECONDS")]
    pub subscription_timeout: u64,
}

impl CliArgs {
    /// Validated configuration
    pub fn into_config(self) -> Result<GroupManagerConfig> {
        let config = GroupManagerConfig {
            revert_delay: Duration::from_secs(self.revert_delay),
            enable_logging: self.enable_logging,
            playbar_rejoin_group_on_play: self.playbar_rejoin_group_on_play,
            pid_file_path: self.pid_file_path.unwrap_or_else(std::env::temp_dir),
            tick_interval: Duration::from_millis(self.tick_interval),
            discovery_timeout: Duration::from_secs(self.discovery_timeout),
            callback_port_range: self.callback_ports,
            subscription_timeout: Duration::from_secs(self.subscription_timeout),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Booleans accept words or integers, where any non-zero integer is on
pub fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        other => other
            .parse::<i64>()
            .map(|n| n != 0)
            .map_err(|_| format!("expected 0/1, true/false, yes/no or on/off, got '{}'", other)),
    }
}

/// `3400-3500`, or a single port
pub fn parse_port_range(value: &str) -> std::result::Result<(u16, u16), String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<u16>()
            .map_err(|_| format!("invalid port '{}'", s.trim()))
    };

    let (start, end) = match value.split_once('-') {
        Some((start, end)) => (parse(start)?, parse(end)?),
        None => {
            let port = parse(value)?;
            (port, port)
        }
    };

    if start > end {
        return Err(format!("port range start {} exceeds end {}", start, end));
    }
    Ok((start, end))
}
