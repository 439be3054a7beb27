use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server settings. Every flag can also come from its `ALLOT_*` variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "allot", about = "Zone and time-slot capacity allocation service.")]
pub struct Config {
    #[arg(long, env = "ALLOT_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, env = "ALLOT_PORT", default_value_t = 7433)]
    pub port: u16,

    #[arg(long, env = "ALLOT_MAX_CONNECTIONS", default_value_t = 256)]
    pub max_connections: usize,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "ALLOT_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// JSON document with zones, slots and staff to provision at startup.
    #[arg(long, env = "ALLOT_PROVISION")]
    pub provision: Option<PathBuf>,

    #[arg(long, env = "ALLOT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
