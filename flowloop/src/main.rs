//! Iterative convergence engine CLI.
//!
//! Reads a run configuration from `flowloop.toml`, drives the combine / test /
//! adjust loop to a terminal phase, and reports the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowloop::core::condition::{Evaluation, SymbolTable, TestExpression};
use flowloop::core::invariants::config_warnings;
use flowloop::core::numeric;
use flowloop::core::registry;
use flowloop::core::types::{RunConfig, RunOutcome, StateEvent, X, Y};
use flowloop::exit_codes;
use flowloop::io::config::{DEFAULT_CONFIG_FILE, load_config, validate, write_config};
use flowloop::io::run_log::{RunLog, write_run_log};
use flowloop::logging;
use flowloop::looping::run_loop;
use tracing::info;

#[derive(Parser)]
#[command(name = "flowloop", version, about = "Iterative convergence engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default configuration if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
    /// Check the configuration against the schema and known operations.
    ///
    /// A test that cannot be evaluated is reported as a warning.
    Validate {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
    /// Run the loop until the test passes, the run fails, or it times out.
    Run {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
        /// Override `limits.timeout_ms`.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Override `limits.max_iterations`.
        #[arg(long)]
        max_iterations: Option<u64>,
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
        /// Print every state event as a JSON line.
        #[arg(long)]
        trace: bool,
        /// Write a JSON run log (config, events, outcome) to this file.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// List the operation catalog.
    Ops {
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one test expression against the given operands.
    Check {
        /// Expression of the form `<operand> <comparator> <value>`.
        test: String,
        #[arg(long)]
        output: String,
        #[arg(long)]
        x: Option<String>,
        #[arg(long)]
        y: Option<String>,
    },
}

fn main() {
    logging::init();
    match run(Cli::parse()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Init { force, path } => cmd_init(&path, force),
        Command::Validate { path } => cmd_validate(&path),
        Command::Run {
            path,
            timeout_ms,
            max_iterations,
            json,
            trace,
            log,
        } => {
            let mut config = load_config(&path)?;
            if let Some(timeout_ms) = timeout_ms {
                config.limits.timeout_ms = timeout_ms;
            }
            if let Some(max_iterations) = max_iterations {
                config.limits.max_iterations = max_iterations;
            }
            validate(&config).context("invalid run limits")?;
            cmd_run(&config, json, trace, log.as_deref())
        }
        Command::Ops { json } => cmd_ops(json),
        Command::Check { test, output, x, y } => cmd_check(&test, &output, x, y),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        info!(path = %path.display(), "config exists, leaving it untouched");
        return Ok(exit_codes::OK);
    }
    write_config(path, &RunConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(exit_codes::OK)
}

fn cmd_validate(path: &Path) -> Result<i32> {
    let config = load_config(path)?;
    for warning in config_warnings(&config) {
        eprintln!("warning: {warning}");
    }
    println!("{}: ok", path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(config: &RunConfig, json: bool, trace: bool, log: Option<&Path>) -> Result<i32> {
    let mut events: Vec<StateEvent> = Vec::new();
    let mut trace_error = None;
    let outcome = run_loop(config, |event| {
        if trace && trace_error.is_none() {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(err) => trace_error = Some(err),
            }
        }
        if log.is_some() {
            events.push(event.clone());
        }
    });
    if let Some(err) = trace_error {
        return Err(err).context("serialize state event");
    }

    if let Some(path) = log {
        write_run_log(
            path,
            &RunLog {
                config,
                events: &events,
                outcome: &outcome,
            },
        )?;
    }

    if json {
        let payload = serde_json::to_string_pretty(&outcome).context("serialize outcome")?;
        println!("{payload}");
    } else {
        print_outcome(&outcome);
    }
    Ok(exit_codes::for_outcome(&outcome))
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Succeeded(report) => println!("{}", report.summary),
        RunOutcome::TimedOut(report) => {
            let output = report
                .output
                .map_or_else(|| "-".to_string(), numeric::format);
            println!(
                "timed out ({:?}) after {} ms and {} iteration(s): output = {}, x = {}, y = {}",
                report.reason, report.elapsed_ms, report.iterations, output, report.x, report.y
            );
        }
        RunOutcome::Failed { error } => eprintln!("run failed: {error}"),
    }
}

fn cmd_ops(json: bool) -> Result<i32> {
    let ops = registry::operations();
    if json {
        let payload = serde_json::to_string_pretty(ops).context("serialize operations")?;
        println!("{payload}");
        return Ok(exit_codes::OK);
    }
    for op in ops {
        let params: Vec<String> = op
            .params
            .iter()
            .map(|p| format!("{}={}", p.name, p.default.unwrap_or("")))
            .collect();
        let role = if op.adjusts {
            "primary, adjustment"
        } else {
            "primary"
        };
        println!(
            "{:<10} {:<10} {:<22} [{}]",
            op.id,
            op.display_name,
            role,
            params.join(", ")
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_check(test: &str, output: &str, x: Option<String>, y: Option<String>) -> Result<i32> {
    let mut symbols = SymbolTable::with_output(numeric::coerce(output));
    if let Some(x) = x {
        symbols.insert(X, numeric::coerce(&x));
    }
    if let Some(y) = y {
        symbols.insert(Y, numeric::coerce(&y));
    }
    match TestExpression::new(test).evaluate(&symbols) {
        Evaluation::Pass => {
            println!("pass");
            Ok(exit_codes::OK)
        }
        Evaluation::Fail => {
            println!("fail");
            Ok(exit_codes::CHECK_FAILED)
        }
        Evaluation::Indeterminate(reason) => {
            println!("indeterminate: {reason}");
            Ok(exit_codes::INVALID)
        }
    }
}
