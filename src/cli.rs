//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration as StdDuration;

use crate::adapters::clock_adapter::SystemClock;
use crate::adapters::csv_adapter::{self, parse_datetime};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::synthetic_feed::{SyntheticFeed, SyntheticFeedConfig, FEED_SECTION};
use crate::domain::bar::Bar;
use crate::domain::config::{
    build_calendar, build_resampler_config, has_calendar, source_timeframe, RESAMPLE_SECTION,
};
use crate::domain::driver;
use crate::domain::error::BarsmithError;
use crate::domain::resampler::Resampler;
use crate::domain::series::BarRecorder;
use crate::ports::config_port::ConfigPort;
use crate::ports::feed_port::Feed;

/// Sleep between polls of a live feed that has nothing to deliver.
const LIVE_POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "barsmith", about = "Calendar-aware bar resampler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resample a CSV sample file
    Resample {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the synthetic feed, resampled if [resample] is configured
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the trading session bounding an instant
    Schedule {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        at: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Resample {
            config,
            input,
            output,
        } => run_resample(&config, &input, output.as_deref()),
        Command::Simulate { config, output } => run_simulate(&config, output.as_deref()),
        Command::Schedule { config, at } => run_schedule(&config, &at),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BarsmithError> {
    FileConfigAdapter::from_file(path).map_err(|e| BarsmithError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn has_resample_section(config: &dyn ConfigPort) -> bool {
    !config.keys(RESAMPLE_SECTION).is_empty()
}

fn write_output(bars: &[Bar], output: Option<&Path>) -> Result<(), BarsmithError> {
    match output {
        Some(path) => {
            csv_adapter::write_bars_to_path(path, bars)?;
            eprintln!("Wrote {} bars to {}", bars.len(), path.display());
            Ok(())
        }
        None => csv_adapter::write_bars(io::stdout().lock(), bars),
    }
}

fn run_resample(
    config_path: &Path,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), BarsmithError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let (timeframe, compression) = source_timeframe(&adapter)?;
    let resampler_config = build_resampler_config(&adapter)?;

    eprintln!("Reading samples from {}", input.display());
    let source = csv_adapter::load_feed(input, timeframe, compression)?;
    eprintln!(
        "Resampling {} samples into {} x {}{}",
        source.len(),
        resampler_config.compression,
        resampler_config.timeframe,
        if resampler_config.calendar.is_some() { " (calendar)" } else { "" }
    );

    let mut resampler = Resampler::new(source, resampler_config)?;
    let mut recorder = BarRecorder::new();
    driver::run(&mut resampler, &mut recorder, || {})?;
    write_output(recorder.series().as_slice(), output)
}

fn run_simulate(config_path: &Path, output: Option<&Path>) -> Result<(), BarsmithError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let feed_config = SyntheticFeedConfig::from_config(&adapter)?;
    let live = feed_config.live;
    eprintln!(
        "Simulating {} {} bars ({})",
        feed_config.compression,
        feed_config.timeframe,
        if live { "live" } else { "backtest" }
    );

    let source = SyntheticFeed::new(feed_config, SystemClock)?;
    let mut feed: Box<dyn Feed> = if has_resample_section(&adapter) {
        Box::new(Resampler::new(source, build_resampler_config(&adapter)?)?)
    } else {
        Box::new(source)
    };

    let mut recorder = BarRecorder::new();
    let summary = driver::run(&mut feed, &mut recorder, || {
        if live {
            std::thread::sleep(LIVE_POLL_INTERVAL);
        }
    })?;
    eprintln!("Feed {} produced {} bars", feed.name(), summary.bars);
    write_output(recorder.series().as_slice(), output)
}

fn run_schedule(config_path: &Path, at: &str) -> Result<(), BarsmithError> {
    let adapter = load_config(config_path)?;
    let calendar = build_calendar(&adapter)?;
    let instant = parse_datetime(at)?;
    let session = calendar.schedule(instant, None)?;
    println!("{},{}", session.start, session.end);
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BarsmithError> {
    eprintln!("Validating {}", config_path.display());
    let adapter = load_config(config_path)?;

    if has_calendar(&adapter) {
        build_calendar(&adapter)?;
        eprintln!("  [calendar] ok");
    }
    if has_resample_section(&adapter) {
        source_timeframe(&adapter)?;
        build_resampler_config(&adapter)?;
        eprintln!("  [resample] ok");
    }
    if !adapter.keys(FEED_SECTION).is_empty() {
        SyntheticFeedConfig::from_config(&adapter)?;
        eprintln!("  [feed] ok");
    }
    eprintln!("Configuration is valid");
    Ok(())
}
