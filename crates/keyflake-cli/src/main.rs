#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use std::io::{self, BufWriter, Write};

use clap::Parser;
use config::{Cli, Command};
use keyflake::{GeneratorConfig, SnowflakeGenerator, Unique};
use telemetry::init_tracing;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing()?;

    let config = GeneratorConfig::try_from(cli.generator)?;
    tracing::debug!(?config, "resolved configuration");

    let mut out = BufWriter::new(io::stdout().lock());
    match cli.command {
        Command::Generate { count } => {
            let generator = SnowflakeGenerator::new(&config)?;
            for _ in 0..count {
                writeln!(out, "{}", generator.next_id()?)?;
            }
        }
        Command::Parse { ids } => {
            let layout = config.bit_layout()?;
            for id in ids {
                writeln!(out, "{}", Unique::decode(&layout, id))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
