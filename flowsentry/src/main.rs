mod args;
mod capture;
mod decode;
mod engine;
mod flow_key;
mod flow_table;
mod flows;
mod metrics;
mod output;
mod packet_record;
mod tests;

use std::{fs::File, path::Path};

use anyhow::Context;
use args::{Cli, Commands, ConfigFile, ExportConfig, OutputConfig};
use capture::PacketSource;
use clap::Parser;
use engine::Engine;
use env_logger::{Env, Target};
use flow_table::FlowTable;
use log::{error, info};
use output::OutputWriter;
use tokio::signal;

pub struct Config {
    pub config: ExportConfig,
    pub output: OutputConfig,
    pub command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }

    // If a config file is provided, load it
    let config: Config = if let Some(config_path) = cli.config_file {
        match confy::load_path::<ConfigFile>(&config_path) {
            Ok(cfg_file) => Config {
                config: cfg_file.config,
                output: cfg_file.output,
                command: cli.command,
            },
            Err(e) => {
                error!("Error loading configuration file: {:?}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config {
            config: cli.config,
            output: cli.output,
            command: cli.command,
        }
    };

    if let Err(e) = run_with_config(config).await {
        error!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

async fn run_with_config(config: Config) -> anyhow::Result<()> {
    if let Commands::Interfaces = config.command {
        return list_interfaces();
    }

    // Rejects out of range durations from a config file before capture starts.
    let flow_table = FlowTable::new(
        config.config.idle_timeout,
        config.config.expiration_check_interval,
    )
    .context("Invalid flow table configuration")?;

    let include_udp = config.config.include_udp;
    let source = match &config.command {
        Commands::Interfaces => return list_interfaces(),
        Commands::Realtime { interface } => PacketSource::live(interface, include_udp),
        Commands::Pcap { path } => PacketSource::pcap_file(path, include_udp),
        Commands::Replay { path } => PacketSource::replay(path, include_udp),
    };
    let mut source = source.map_err(|e| {
        error!("Failed to open packet source: {:?}", e);
        e
    })?;

    let output_writer = OutputWriter::new(
        &config.output.output,
        &config.output.export_path,
        config.output.flush_every,
    )?;
    let mut engine = Engine::new(flow_table, output_writer, config.config.fin_column);

    let run_result = engine.run(&mut source, ctrl_c()).await;

    // Flush the sink before releasing the capture, whatever ended the loop.
    let shutdown_result = engine.shutdown();
    let capture_result = source.close();

    match capture_result {
        Ok(stats) => info!(
            "Capture closed: {} received, {} forwarded, {} filtered",
            stats.received, stats.forwarded, stats.filtered
        ),
        Err(ref e) => error!("Packet source failed: {:?}", e),
    }

    run_result?;
    shutdown_result?;
    capture_result?;
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn list_interfaces() -> anyhow::Result<()> {
    let devices = pcap::Device::list().context("Failed to list capture devices")?;
    println!("Available network interfaces:");
    for device in devices {
        match device.desc {
            Some(desc) => println!("- {} ({})", device.name, desc),
            None => println!("- {}", device.name),
        }
    }
    Ok(())
}
