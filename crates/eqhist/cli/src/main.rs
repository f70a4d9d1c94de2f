// Eqhist
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Eqhist CLI Tool
//!
//! Command-line interface for building and querying equi-height histograms.

use anyhow::{Context, bail};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use eqhist_core::statistics::{AnyHistogram, Comparison, DataType, EquiHeight, HistogramValue, StatisticsConfig, ValueMap};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const NULL_LITERAL: &str = "NULL";

#[derive(Parser)]
#[command(name = "eqhist")]
#[command(about = "Eqhist - equi-height histogram builder and selectivity estimator")]
#[command(version = "0.1.0")]
struct Cli {
    /// JSON statistics configuration file
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a histogram from a file holding one value per line
    Build {
        /// Value type of the column
        #[arg(long = "type", short = 't', value_parser = parse_data_type)]
        data_type: DataType,
        /// Input file; the literal NULL marks a null value
        #[arg(long, short = 'i')]
        input: PathBuf,
        /// Number of buckets (defaults to the configured default)
        #[arg(long, short = 'b')]
        buckets: Option<usize>,
        /// Fraction of the column the input was sampled from
        #[arg(long)]
        sampling_rate: Option<f64>,
    },
    /// Estimate the selectivity of a comparison against a stored histogram
    Estimate {
        /// Histogram document
        #[arg(long = "histogram")]
        histogram: PathBuf,
        /// Comparison operator (eq, ne, lt, le, gt, ge)
        #[arg(long, value_parser = parse_comparison)]
        op: Comparison,
        /// Literal to compare against
        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },
    /// Validate a histogram document and print its buckets
    Inspect {
        /// Histogram document
        #[arg(long = "histogram")]
        histogram: PathBuf,
        /// Skip ordering and mass checks
        #[arg(long)]
        trusted: bool,
    },
}

fn parse_data_type(s: &str) -> Result<DataType, String> {
    s.parse().map_err(|e: eqhist_core::statistics::HistogramError| e.to_string())
}

fn parse_comparison(s: &str) -> Result<Comparison, String> {
    s.parse().map_err(|e: eqhist_core::statistics::HistogramError| e.to_string())
}

fn setup_logging() {
    // Logs go to stderr so stdout carries only command output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    setup_logging();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Build {
            data_type,
            input,
            buckets,
            sampling_rate,
        } => handle_build(&config, data_type, &input, buckets, sampling_rate),
        Commands::Estimate { histogram, op, value } => handle_estimate(&config, &histogram, op, &value),
        Commands::Inspect { histogram, trusted } => handle_inspect(&histogram, trusted || config.trust_stored_documents),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<StatisticsConfig> {
    let Some(path) = path else {
        return Ok(StatisticsConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(StatisticsConfig::from_json_str(&text)?)
}

fn read_document(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn build_typed<T: HistogramValue>(lines: &[&str], sampling_rate: f64, buckets: usize) -> anyhow::Result<Value> {
    let mut observations = Vec::with_capacity(lines.len());
    for (number, line) in lines.iter().enumerate() {
        let observation = if *line == NULL_LITERAL {
            None
        } else {
            Some(T::parse_literal(line).with_context(|| format!("line {}", number + 1))?)
        };
        observations.push(observation);
    }

    let value_map = ValueMap::from_observations(observations, sampling_rate)?;
    let histogram = EquiHeight::build(&value_map, buckets)?;
    info!(
        values = value_map.len(),
        nulls = value_map.null_count(),
        buckets = histogram.num_buckets(),
        "built {} histogram",
        T::DATA_TYPE
    );
    Ok(histogram.to_document())
}

fn handle_build(config: &StatisticsConfig, data_type: DataType, input: &Path, buckets: Option<usize>, sampling_rate: Option<f64>) -> anyhow::Result<()> {
    let buckets = buckets.unwrap_or(config.default_buckets);
    if buckets > config.max_buckets {
        bail!("{} buckets exceed the configured maximum of {}", buckets, config.max_buckets);
    }
    let sampling_rate = sampling_rate.unwrap_or(config.sampling_rate);

    let text = std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let lines: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();

    let doc = match data_type {
        DataType::Int => build_typed::<i64>(&lines, sampling_rate, buckets)?,
        DataType::Uint => build_typed::<u64>(&lines, sampling_rate, buckets)?,
        DataType::Double => build_typed::<f64>(&lines, sampling_rate, buckets)?,
        DataType::String => build_typed::<String>(&lines, sampling_rate, buckets)?,
        DataType::Bytes => build_typed::<Vec<u8>>(&lines, sampling_rate, buckets)?,
        DataType::Date => build_typed::<NaiveDate>(&lines, sampling_rate, buckets)?,
        DataType::Datetime => build_typed::<NaiveDateTime>(&lines, sampling_rate, buckets)?,
    };
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn handle_estimate(config: &StatisticsConfig, path: &Path, op: Comparison, literal: &str) -> anyhow::Result<()> {
    let histogram = AnyHistogram::from_document(&read_document(path)?, config.trust_stored_documents)?;
    let selectivity = histogram.selectivity_str(op, literal)?;
    println!("{selectivity:.6}");
    info!("Estimated column {} {} as {:.6}", op, literal, selectivity);
    Ok(())
}

fn handle_inspect(path: &Path, trusted: bool) -> anyhow::Result<()> {
    let histogram = AnyHistogram::from_document(&read_document(path)?, trusted)?;

    println!("data type:         {}", histogram.data_type());
    println!("buckets:           {} of {} specified", histogram.num_buckets(), histogram.num_buckets_specified());
    println!("null fraction:     {:.6}", histogram.null_values_fraction());
    println!("sampling rate:     {}", histogram.sampling_rate());
    println!("distinct values:   {}", histogram.num_distinct_values());
    println!();
    println!("{:>5}  {:>24}  {:>24}  {:>10}  {:>8}", "#", "lower", "upper", "cumulative", "ndv");
    for (index, (lower, upper, cumulative, ndv)) in histogram.bucket_rows().into_iter().enumerate() {
        println!("{index:>5}  {:>24}  {:>24}  {cumulative:>10.6}  {ndv:>8}", lower.to_string(), upper.to_string());
    }
    Ok(())
}
