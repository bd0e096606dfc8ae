//! Run configuration: command-line flags plus environment-only settings.
//!
//! Every flag can also be supplied through the environment variable named
//! in its help text, so the binary runs unchanged from cron or a systemd
//! unit with an `.env` file.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ringrepair_core::retry::RetryPolicy;

use crate::admin::{Credentials, NodetoolClient};
use crate::orchestrator::RunOptions;
use crate::pacing::{PauseGate, DEFAULT_PAUSE_POLL};
use crate::status::StatusReporter;

const DEFAULT_NODETOOL_BIN: &str = "nodetool";
const DEFAULT_PAUSE_FILE: &str = "/var/lib/cassandra/range_repair.pause";
const DEFAULT_STATUS_FILE: &str = "/var/lib/cassandra/range_repair.status";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Username and password must be given together")]
    PartialCredentials,
}

/// Repair this node's token ranges one slice at a time.
#[derive(Parser, Debug, Clone)]
#[command(name = "range-repair", version)]
pub struct Args {
    /// Keyspace to repair. Defaults to every non-system keyspace.
    pub keyspace: Option<String>,

    /// Spread the whole run over this many hours. `0` runs unpaced.
    #[arg(long, env = "REPAIR_HOURS", default_value_t = 0.0, value_parser = parse_hours)]
    pub hours: f64,

    /// Address of this node as the admin tool reports it. Skips detection.
    #[arg(long, env = "REPAIR_LOCAL_ADDRESS")]
    pub local_address: Option<String>,

    #[arg(long, env = "NODETOOL_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "NODETOOL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Repair only the primary replica of each range.
    #[arg(long, env = "REPAIR_PRIMARY_RANGE")]
    pub primary_range: bool,

    /// Extra attempts for a failed range before it counts as failed.
    #[arg(long, env = "REPAIR_RETRIES", default_value_t = 0)]
    pub retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[arg(long, env = "REPAIR_RETRY_DELAY_SECS", default_value_t = 30)]
    pub retry_delay_secs: u64,

    /// Kill a single range repair after this many minutes. `0` waits forever.
    #[arg(long, env = "REPAIR_UNIT_TIMEOUT_MINS", default_value_t = 0)]
    pub unit_timeout_mins: u64,

    /// Print the plan as JSON and exit without repairing anything.
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_hours(value: &str) -> Result<f64, String> {
    let hours: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if !hours.is_finite() || hours < 0.0 {
        return Err(format!("`{value}` must be a non-negative number of hours"));
    }
    Ok(hours)
}

impl Args {
    /// Credentials for the admin tool, if any. Supplying only one half is
    /// rejected rather than silently ignored.
    pub fn credentials(&self) -> Result<Option<Credentials>, ConfigError> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (None, None) => Ok(None),
            (Some(user), Some(password)) => {
                if user.is_empty() {
                    return Err(ConfigError::Invalid {
                        name: "NODETOOL_USERNAME",
                        reason: "must not be empty".into(),
                    });
                }
                Ok(Some(Credentials::new(user, password)))
            }
            _ => Err(ConfigError::PartialCredentials),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_retries(self.retries, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn unit_timeout(&self) -> Option<Duration> {
        (self.unit_timeout_mins > 0)
            .then(|| Duration::from_secs(self.unit_timeout_mins.saturating_mul(60)))
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            keyspace: self.keyspace.clone(),
            local_address: self.local_address.clone(),
            total_hours: self.hours,
            primary_range_only: self.primary_range,
            retry: self.retry_policy(),
        }
    }
}

/// Settings that only come from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairSettings {
    /// Admin tool program.
    pub nodetool_program: String,
    /// Arguments placed before every subcommand, e.g. `-h host -p 7199`.
    pub nodetool_args: Vec<String>,
    pub pause_file: PathBuf,
    pub status_file: PathBuf,
    pub pause_poll: Duration,
}

impl RepairSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                  |
    /// |--------------------------|------------------------------------------|
    /// | `NODETOOL_BIN`           | `nodetool`                               |
    /// | `NODETOOL_ARGS`          | (none)                                   |
    /// | `REPAIR_PAUSE_FILE`      | `/var/lib/cassandra/range_repair.pause`  |
    /// | `REPAIR_STATUS_FILE`     | `/var/lib/cassandra/range_repair.status` |
    /// | `REPAIR_PAUSE_POLL_SECS` | `60`                                     |
    ///
    /// `NODETOOL_BIN` may itself carry leading arguments; it is split on
    /// whitespace and the first word becomes the program.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bin = lookup("NODETOOL_BIN").unwrap_or_else(|| DEFAULT_NODETOOL_BIN.into());
        let mut words = bin.split_whitespace().map(str::to_string);
        let nodetool_program = words.next().ok_or_else(|| ConfigError::Invalid {
            name: "NODETOOL_BIN",
            reason: "must name a program".into(),
        })?;
        let mut nodetool_args: Vec<String> = words.collect();
        if let Some(extra) = lookup("NODETOOL_ARGS") {
            nodetool_args.extend(extra.split_whitespace().map(str::to_string));
        }

        let pause_file = lookup("REPAIR_PAUSE_FILE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PAUSE_FILE.into());
        let status_file = lookup("REPAIR_STATUS_FILE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS_FILE.into());

        let pause_poll = match lookup("REPAIR_PAUSE_POLL_SECS") {
            None => DEFAULT_PAUSE_POLL,
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "REPAIR_PAUSE_POLL_SECS",
                    reason: format!("`{raw}` is not a whole number of seconds"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        name: "REPAIR_PAUSE_POLL_SECS",
                        reason: "must be at least 1".into(),
                    });
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Self {
            nodetool_program,
            nodetool_args,
            pause_file: pause_file.into(),
            status_file: status_file.into(),
            pause_poll,
        })
    }

    pub fn pause_gate(&self) -> PauseGate {
        PauseGate::new(&self.pause_file, self.pause_poll)
    }

    pub fn status_reporter(&self) -> StatusReporter {
        StatusReporter::new(&self.status_file)
    }
}

/// Build the admin tool client from both configuration sources.
pub fn nodetool_client(
    args: &Args,
    settings: &RepairSettings,
) -> Result<NodetoolClient, ConfigError> {
    Ok(NodetoolClient::new(&settings.nodetool_program)
        .with_base_args(settings.nodetool_args.clone())
        .with_credentials(args.credentials()?)
        .with_unit_timeout(args.unit_timeout()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
