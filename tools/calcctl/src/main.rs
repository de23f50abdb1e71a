//! calcctl - run the mortgage calculator through scripted input edits
//!
//! Starts the calculator scheduler, forces a first evaluation, applies the
//! `--set` edits to the inputs (optionally committing them, which writes
//! clamped values back), then stops the scheduler and prints the state.

mod config;
mod mortgage;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use reactive_calc::{CalcOutput, CalcScheduler, Calculator, SharedInput};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "calcctl")]
#[command(about = "Run the mortgage calculator through scripted input edits")]
#[command(long_about = "Run the mortgage calculator through scripted input edits

Fields (code / input name):
  INV   / investment   Down payment, between PRICE/5 and PRICE-500000 (at most 85% of PRICE)
  DUR   / duration     Duration in years, 1..30
  PRICE / price        Property price, 625000..20000000

Examples:
  calcctl                                  # Default mortgage
  calcctl --set DUR=40                     # Clamped to 30, input flagged invalid
  calcctl --set DUR=40 --commit            # Clamped value written back to the input
  calcctl --set price=\"1 000 000\" --json   # Machine-readable output")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "CALC_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configuration file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Type VALUE into the input of field CODE (code or input name)
    #[arg(short, long = "set", value_name = "CODE=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, String)>,

    /// Commit (blur) the edited inputs
    #[arg(long)]
    commit: bool,

    /// Scheduler tick in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Print values and results as JSON
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    let (code, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=VALUE, got '{}'", s))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(format!("missing field code in '{}'", s));
    }
    Ok((code.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.calculator.tick_ms = tick_ms;
    }
    let _guard = common::init_logging(&config.log)?;

    let mortgage = mortgage::build(config.calculator.clone())?;
    let mut edits: Vec<(Arc<SharedInput>, &str)> = Vec::with_capacity(cli.set.len());
    for (key, raw) in &cli.set {
        let input = mortgage
            .input(key)
            .cloned()
            .with_context(|| format!("Unknown field: {}", key))?;
        edits.push((input, raw.as_str()));
    }
    let inputs = mortgage.inputs.clone();

    // A few ticks are enough for an edit and its commit to be picked up
    let settle = Duration::from_millis(config.calculator.tick_ms.max(1) * 3);

    let scheduler = CalcScheduler::spawn(mortgage.calculator);
    scheduler.with(Calculator::force_change);
    tokio::time::sleep(settle).await;

    for (input, raw) in &edits {
        debug!("Typing '{}'", raw);
        input.set(*raw);
    }
    if cli.commit {
        for (input, _) in &edits {
            input.commit();
        }
    }
    if !edits.is_empty() {
        tokio::time::sleep(settle).await;
    }

    scheduler.stop();
    let status = scheduler.status();
    let calculator = scheduler.calculator();
    scheduler.join().await?;
    info!(
        "Scheduler finished after {} ticks ({} errors)",
        status.ticks, status.errors
    );

    let mut calculator = calculator.lock();
    let outputs = calculator.calc()?;

    if cli.json {
        let report = serde_json::json!({
            "values": calculator.values(),
            "results": outputs,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&calculator, &outputs, &inputs);
    }

    Ok(())
}

fn print_report(
    calculator: &Calculator,
    outputs: &[CalcOutput],
    inputs: &BTreeMap<String, Arc<SharedInput>>,
) {
    println!();
    println!("{}", "=== Fields ===".bright_cyan());
    for field in calculator.fields() {
        let value = calculator
            .values()
            .get(field.code())
            .map(ToString::to_string)
            .unwrap_or_default();
        let shown = inputs
            .get(field.code())
            .map(|input| format!("  [input: {}]", input.raw()))
            .unwrap_or_default();
        let flag = if field.is_invalid() {
            " INVALID".red().to_string()
        } else {
            String::new()
        };

        println!(
            "  {:<6} {:<18} {:>12}{}{}",
            field.code().bright_yellow(),
            field.title(),
            value,
            shown,
            flag
        );
    }

    println!();
    println!("{}", "=== Results ===".bright_cyan());
    for output in outputs {
        println!(
            "  {:<25} {}",
            output.title,
            output.value_formatted.green().bold()
        );
    }
    println!();
}
