use crate::cli_args::ListArgs;
use crate::load_config_for_command;
use crate::output::{self, FileRow};
use anyhow::{Context, Result};
use colored::*;
use jsmashy_core::{Config, ScanReport, Scanner};
use log;
use tiktoken_rs::CoreBPE;

pub fn handle_list_command(args: ListArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.scan.root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.scan)
        .context("Failed to load configuration for list command")?;

    let report = Scanner::from_config(&config)
        .context("Failed to set up scanner")?
        .scan_with_report(&project_root)
        .with_context(|| format!("Failed to scan {}", project_root.display()))?;

    let bpe = output::token_encoder()?;
    let rows = build_rows(&report, &bpe);
    output::print_file_table(&rows);

    if !quiet && report.skipped() + report.degraded > 0 {
        println!(
            "{}",
            format!(
                "Skipped: {} excluded, {} binary, {} oversized, {} unreadable; {} stored raw after analyzer errors",
                report.excluded, report.binary, report.oversized, report.unreadable, report.degraded
            )
            .dimmed()
        );
    }
    Ok(())
}

fn build_rows(report: &ScanReport, bpe: &CoreBPE) -> Vec<FileRow> {
    report
        .files
        .iter()
        .map(|file| FileRow {
            path: file.path.clone(),
            bytes: file.content.len() as u64,
            tokens: output::count_tokens(bpe, &file.content),
            skeletonized: file.skeletonized,
        })
        .collect()
}
