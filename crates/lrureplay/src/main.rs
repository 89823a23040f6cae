//! LRU replay tool - run scripted get/put operations against an LruCache

mod replay;
mod script;

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use lrucache::{CacheConfig, Capacity};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::replay::{Replayer, Report};
use crate::script::parse_script;

/// Capacity used when neither `--capacity` nor `--config` is given
const DEFAULT_CAPACITY: usize = 2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Operation script (reads stdin when omitted)
    script: Option<PathBuf>,

    /// Cache capacity (number of entries), overrides --config
    #[arg(short, long, allow_negative_numbers = true)]
    capacity: Option<i64>,

    /// JSON config file, e.g. {"capacity": 64}
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(log_filter(args.quiet, rust_log.as_deref()))
        .init();

    let capacity = resolve_capacity(args.capacity, args.config.as_deref())?;
    let text = read_script(args.script.as_deref())?;
    let script = parse_script(&text).context("Failed to parse script")?;

    info!("Replaying {} operations", script.steps.len());
    info!("Cache capacity: {}", capacity);

    let report = Replayer::new(capacity).run(&script);
    println!("{}", render(&report, args.json)?);

    let failures = report.failures();
    if failures > 0 {
        bail!("{} expectation(s) failed", failures);
    }

    info!(
        "Done: {} hits, {} misses, {} evictions",
        report.stats.hits, report.stats.misses, report.stats.evictions
    );
    Ok(())
}

/// Build the log filter from `RUST_LOG`; `info` (or `warn` when quiet) applies
/// only when `RUST_LOG` sets no directives
fn log_filter(quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    let fallback = if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(fallback.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

/// Pick the capacity: flag first, then config file, then the default
fn resolve_capacity(flag: Option<i64>, config: Option<&Path>) -> Result<Capacity> {
    if let Some(capacity) = flag {
        return Ok(Capacity::try_from(capacity)?);
    }

    if let Some(path) = config {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = CacheConfig::from_json(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        return Ok(config.capacity);
    }

    Ok(Capacity::new(DEFAULT_CAPACITY)?)
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read script from stdin")?;
            Ok(text)
        }
    }
}

fn render(report: &Report, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut lines: Vec<String> = report.outcomes.iter().map(ToString::to_string).collect();
    let stats = &report.stats;
    lines.push(String::new());
    lines.push(format!(
        "capacity {}: {} hits, {} misses, {} evictions, hit ratio {:.2}",
        report.capacity, stats.hits, stats.misses, stats.evictions, stats.hit_ratio
    ));
    Ok(lines.join("\n"))
}
