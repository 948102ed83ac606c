use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use anyhow::bail;
use chrono::{DateTime, Utc};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use spreadline::timed::Timed;
use spreadline_features::config::EngineConfig;
use spreadline_features::data::read_game_log;
use spreadline_features::pipeline::refresh;
use spreadline_features::print::{tabulate_matchups, tabulate_skipped};
use spreadline_features::table::write_tables;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// engine config file (TOML); the defaults apply if omitted
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// game log to read: a JSON or CSV file, or a directory of them
    #[clap(short = 'i', long)]
    input: PathBuf,

    /// directory to write the output tables to
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    /// ignore records timestamped after this instant (RFC 3339)
    #[clap(short = 'u', long)]
    until: Option<DateTime<Utc>>,

    /// number of upcoming matchups to print
    #[clap(short = 't', long, default_value = "20")]
    top: usize,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if !self.input.exists() {
            bail!("input {:?} does not exist", self.input);
        }
        if let Some(output) = &self.output {
            if output.exists() && !output.is_dir() {
                bail!("output {output:?} is not a directory");
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let config = match &args.config {
        None => EngineConfig::default(),
        Some(path) => EngineConfig::load(path)?,
    };
    debug!("config: {config:?}");

    let records = read_game_log(&args.input)?;
    info!("read {} records from {:?}", records.len(), args.input);

    let Timed {
        value: output,
        elapsed,
    } = Timed::result(|| refresh(&records, args.until, &config))?;
    info!("refresh took {elapsed:?}");

    if let Some(dir) = &args.output {
        fs::create_dir_all(dir)?;
        write_tables(&output, &config, dir)?;
        info!("wrote tables to {dir:?}");
    }

    if !output.skipped.is_empty() {
        let table = tabulate_skipped(&output.skipped);
        info!("skipped records:\n{}", Console::default().render(&table));
    }
    let table = tabulate_matchups(&output.matchups, args.top);
    info!("upcoming matchups:\n{}", Console::default().render(&table));
    Ok(())
}
