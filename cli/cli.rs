mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, ScanOpts};
use jsmashy_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = match e.downcast_ref::<AppError>() {
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::RootNotFound { .. }) => 2,
                Some(AppError::RootNotDirectory(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::WalkDir(_)) => 2,
                Some(AppError::Glob(_)) => 5,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::SizeParse(_)) => 5,
                Some(_) => 1,
                None => 1,
            };

            // Config and usage errors are shown even when quiet.
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(Commands::Smash(args)) => {
            log::debug!("Executing 'smash' command...");
            commands::smash::handle_smash_command(args, quiet)?;
        }
        Some(Commands::List(args)) => {
            log::debug!("Executing 'list' command...");
            commands::list::handle_list_command(args, quiet)?;
        }
    }
    Ok(())
}

fn merge_config_with_cli_overrides(mut config: Config, opts: &ScanOpts) -> Config {
    log::trace!("Applying CLI overrides to config...");

    if opts.no_gitignore {
        config.general.use_gitignore = false;
    }
    if !opts.exclude.is_empty() {
        config.general.exclude.extend(opts.exclude.iter().cloned());
    }
    if let Some(size) = &opts.max_file_size {
        config.general.max_file_size = Some(size.clone());
    }
    if opts.no_skeleton {
        config.skeleton.enabled = false;
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// Loads the config file for `project_root` (unless disabled) and applies
/// the scan flags on top of it.
pub fn load_config_for_command(project_root: &Path, opts: &ScanOpts) -> Result<Config> {
    let config_path =
        Config::resolve_config_path(project_root, opts.config.as_ref(), opts.no_config)
            .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    Ok(merge_config_with_cli_overrides(config, opts))
}
