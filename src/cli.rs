//! Command line interface.
//!
//! Flags override values read from `--config`; the merged result is
//! validated exactly like a config file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{read_config, validate_config, ConfigError, RequestLogFormat, ServerConfig};

/// HTTP endpoint that fails on a schedule
///
/// Answers every request with a configurable status code and can cycle
/// between runs of failures and successes to exercise client retry logic.
#[derive(Parser, Debug)]
#[command(name = "flaky-server", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Answer requests without dumping them
    Serve,

    /// Dump every incoming request, raw or as JSON
    Log {
        /// Dump requests as JSON
        #[arg(short, long)]
        json: bool,

        /// Indent JSON output (implies --json)
        #[arg(short, long)]
        pretty: bool,
    },
}

/// Settings that may be given on the command line.
#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    /// Address to listen on (e.g. 127.0.0.1:8080)
    #[arg(long = "http", value_name = "ADDR", global = true)]
    pub bind_address: Option<String>,

    /// Default response status code
    #[arg(long, global = true)]
    pub code: Option<u16>,

    /// Delay every response by this many milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub delay: Option<u64>,

    /// Echo the request body back in the response
    #[arg(long, global = true)]
    pub echo: bool,

    /// Append request dumps to this file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub out: Option<PathBuf>,

    /// Enable the failure cycle
    #[arg(long, global = true)]
    pub simulate_failures: bool,

    /// Consecutive failures per cycle
    #[arg(long, allow_negative_numbers = true, global = true)]
    pub failure_count: Option<i64>,

    /// Consecutive successes per cycle
    #[arg(long, allow_negative_numbers = true, global = true)]
    pub success_count: Option<i64>,

    /// Status code returned during the failure phase
    #[arg(long, global = true)]
    pub failure_code: Option<u16>,

    /// Status code returned during the success phase
    #[arg(long, global = true)]
    pub success_code: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl Overrides {
    fn touches_failure_cycle(&self) -> bool {
        self.simulate_failures
            || self.failure_count.is_some()
            || self.success_count.is_some()
            || self.failure_code.is_some()
            || self.success_code.is_some()
    }

    /// Apply the flags on top of `config`.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(addr) = &self.bind_address {
            config.listener.bind_address = addr.clone();
        }
        if let Some(code) = self.code {
            config.response.status_code = code;
        }
        if let Some(delay) = self.delay {
            config.response.delay_ms = delay;
        }
        if self.echo {
            config.response.echo = true;
        }
        if let Some(out) = &self.out {
            config.request_log.output = Some(out.clone());
        }
        if self.touches_failure_cycle() {
            config.failure.enabled = true;
        }
        if let Some(count) = self.failure_count {
            config.failure.failure_count = count;
        }
        if let Some(count) = self.success_count {
            config.failure.success_count = count;
        }
        if let Some(code) = self.failure_code {
            config.failure.failure_code = code;
        }
        if let Some(code) = self.success_code {
            config.failure.success_code = code;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

impl Command {
    fn apply(&self, config: &mut ServerConfig) {
        match self {
            Command::Serve => {}
            Command::Log { json, pretty } => {
                config.request_log.enabled = true;
                if *pretty {
                    config.request_log.format = RequestLogFormat::PrettyJson;
                } else if *json {
                    config.request_log.format = RequestLogFormat::Json;
                }
            }
        }
    }
}

impl Cli {
    /// Merge config file, subcommand and flags into a validated config.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };

        self.command.apply(&mut config);
        self.overrides.apply(&mut config);

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
