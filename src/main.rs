//! `typed-sheet` command line tool.

use clap::Parser;
use std::io;
use std::io::IsTerminal;
use typed_sheet::config::load_config;
use typed_sheet::logging::init_logging;
use typed_sheet::logging::LogConfig;
use typed_sheet::logging::LogFormat;

mod cli;
mod commands;

use crate::cli::Cli;
use crate::cli::Command;
use crate::cli::LogFormatArg;
use crate::commands::print_report;
use crate::commands::run_convert;
use crate::commands::run_generate;
use crate::commands::run_list;
use crate::commands::run_schema;

fn main() {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let exit_code = match &cli.command {
        Command::Convert(args) => match run_convert(args, &config) {
            Ok(report) => {
                print_report(&report);
                if report.is_success() { 0 } else { 1 }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Generate(args) => match run_generate(args, &config) {
            Ok(report) => {
                print_report(&report);
                if report.is_success() { 0 } else { 1 }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::List(args) => match run_list(args, &config) {
            Ok(listing) => {
                if listing.failures.is_empty() { 0 } else { 1 }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Schema(args) => match run_schema(args, &config) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::default()
        .with_level(cli.verbosity.tracing_level_filter())
        .with_log_file(cli.log_file.clone());
    config.use_env_filter = !cli.verbosity.is_present();
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.with_ansi = cli.log_file.is_none() && io::stderr().is_terminal();
    config
}
