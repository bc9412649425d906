//! Thai e-Tax document validator CLI.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use clap::{ColorChoice, Parser};
use etax_cli::logging::{LogConfig, LogFormat, init_logging};
use etax_validate::{BundleLoader, RuleSource, rules_root_from_env};
use tracing::debug;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_doctor, run_validate};
use crate::summary::print_types;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let source = match cli.rules_dir.clone().or_else(rules_root_from_env) {
        Some(root) => RuleSource::Directory(root),
        None => RuleSource::Embedded,
    };
    debug!(?source, "rule source selected");
    let loader = Arc::new(BundleLoader::with_source(source));

    let exit_code = match &cli.command {
        Command::Validate(args) => match run_validate(args, loader) {
            Ok(run) => {
                if run.passed(args.fail_on_warnings) { 0 } else { 1 }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Types => {
            print_types();
            0
        }
        Command::Doctor(args) => match run_doctor(args, &loader) {
            Ok(report) => {
                if report.all_healthy() { 0 } else { 1 }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
