use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::{flow_table::MAX_TIMEOUT_SECS, metrics::FinColumn};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Flow table and feature options
    #[clap(flatten)]
    pub config: ExportConfig,

    /// Output method
    #[clap(flatten)]
    pub output: OutputConfig,

    /// TOML file with `config` and `output` sections, replaces the options above
    #[clap(long)]
    pub config_file: Option<String>,

    /// Write log records to this file instead of stderr
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Real-time feature extraction
    Realtime {
        /// The network interface to capture packets from
        interface: String,
    },

    /// Feature extraction from a pcap file
    Pcap {
        /// The relative path to the pcap file
        path: String,
    },

    /// Feature extraction from a CSV file of decoded packets
    Replay {
        /// The relative path to the CSV file
        path: String,
    },

    /// List the interfaces available for capture
    Interfaces,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Evict flows with no packets for this many seconds (default: never evict)
    #[clap(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub idle_timeout: Option<u64>,

    /// How often, in seconds of packet time, idle flows are looked for
    #[clap(
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(0..=MAX_TIMEOUT_SECS)
    )]
    pub expiration_check_interval: u64,

    /// Also track UDP datagrams, by default only TCP segments are kept
    #[clap(long, action = clap::ArgAction::SetTrue)]
    pub include_udp: bool,

    /// Counter reported in the "FIN Flag Count" column
    #[clap(long, value_enum, default_value_t = FinColumn::Rst)]
    pub fin_column: FinColumn,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            idle_timeout: None,
            expiration_check_interval: 60,
            include_udp: false,
            fin_column: FinColumn::Rst,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output method
    #[clap(short, long, value_enum, default_value_t = ExportMethodType::Csv)]
    pub output: ExportMethodType,

    /// File path for output (used if method is Csv), flow start times are written in UTC
    #[clap(long, default_value = "captured_traffic.csv")]
    pub export_path: PathBuf,

    /// Flush the output after this many rows
    #[clap(long, default_value_t = 1)]
    pub flush_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            output: ExportMethodType::Csv,
            export_path: PathBuf::from("captured_traffic.csv"),
            flush_every: 1,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMethodType {
    /// The output will be printed to the console
    Print,

    /// The output will be written to a CSV file
    Csv,
}

/// Configuration file layout.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub config: ExportConfig,
    pub output: OutputConfig,
}
