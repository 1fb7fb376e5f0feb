use crate::cli_args::SmashArgs;
use crate::load_config_for_command;
use crate::output::{self, SmashSummary};
use anyhow::{Context, Result};
use jsmashy_core::{Config, Scanner, SerializeOptions, serialize};
use log;

pub fn handle_smash_command(args: SmashArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.scan.root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let mut config = load_config_for_command(&project_root, &args.scan)
        .context("Failed to load configuration for smash command")?;
    if args.timestamp {
        config.output.include_timestamp = true;
    }

    let scanner = Scanner::from_config(&config).context("Failed to set up scanner")?;
    let report = scanner
        .scan_with_report(&project_root)
        .with_context(|| format!("Failed to scan {}", project_root.display()))?;

    let document = serialize(&report.files, &SerializeOptions::from_config(&config));

    match &args.output {
        Some(path) => {
            output::write_to_file(path, &document)?;
            if !quiet {
                let bpe = output::token_encoder()?;
                let summary = SmashSummary {
                    file_count: report.files.len(),
                    skipped: report.skipped(),
                    degraded: report.degraded,
                    output_bytes: document.len() as u64,
                    estimated_tokens: output::count_tokens(&bpe, &document),
                };
                output::print_smash_summary(path, &summary);
            }
        }
        None => output::write_to_stdout(&document)?,
    }
    Ok(())
}
