use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use jsmashy_core::AppError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tiktoken_rs::{CoreBPE, cl100k_base};

/// One row of the `list` table.
#[derive(Debug)]
pub struct FileRow {
    pub path: String,
    pub bytes: u64,
    pub tokens: usize,
    pub skeletonized: bool,
}

#[derive(Debug, Default)]
pub struct SmashSummary {
    pub file_count: usize,
    pub skipped: usize,
    pub degraded: usize,
    pub output_bytes: u64,
    pub estimated_tokens: usize,
}

pub fn token_encoder() -> Result<CoreBPE> {
    cl100k_base().context("Failed to load cl100k_base tokenizer")
}

pub fn count_tokens(bpe: &CoreBPE, text: &str) -> usize {
    bpe.encode_ordinary(text).len()
}

pub fn readable_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    let write_error = |target: &Path, source: io::Error| AppError::FileWrite {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| write_error(parent, e))
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file = File::create(path)
        .map_err(|e| write_error(path, e))
        .with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .map_err(|e| write_error(path, e))
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_smash_summary(path: &Path, summary: &SmashSummary) {
    println!(
        "{} Codebase smashed to: {}",
        "✅".green(),
        path.display().to_string().blue()
    );
    println!(
        "{:<20} {}",
        "Files:".green(),
        summary.file_count.to_string().cyan()
    );
    if summary.skipped > 0 || summary.degraded > 0 {
        println!(
            "{:<20} {}",
            "Skipped/Raw:".green(),
            format!("{} / {}", summary.skipped, summary.degraded).yellow()
        );
    }
    println!(
        "{:<20} {}",
        "Output Size:".green(),
        readable_size(summary.output_bytes).cyan()
    );
    println!(
        "{:<20} {}",
        "Est. Tokens:".green(),
        summary.estimated_tokens.to_string().cyan()
    );
}

pub fn print_file_table(rows: &[FileRow]) {
    if rows.is_empty() {
        println!("{}", "(No files would be included)".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Path").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
        Cell::new("Tokens").fg(Color::Green),
        Cell::new("Skeleton").fg(Color::Green),
    ]);
    for row in rows {
        let skeleton = if row.skeletonized {
            Cell::new("yes").fg(Color::Cyan)
        } else {
            Cell::new("-").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&row.path).fg(Color::Cyan),
            Cell::new(readable_size(row.bytes))
                .set_alignment(CellAlignment::Right)
                .fg(Color::DarkGrey),
            Cell::new(row.tokens).set_alignment(CellAlignment::Right),
            skeleton.set_alignment(CellAlignment::Center),
        ]);
    }
    println!("{table}");

    let total_bytes: u64 = rows.iter().map(|r| r.bytes).sum();
    let total_tokens: usize = rows.iter().map(|r| r.tokens).sum();
    println!(
        "{} files, {}, ~{} tokens",
        rows.len().to_string().cyan(),
        readable_size(total_bytes).cyan(),
        total_tokens.to_string().cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(readable_size(0), "0 B");
        assert_eq!(readable_size(2048), "2 KiB");
    }

    #[test]
    fn write_to_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.xml");
        write_to_file(&target, "<codebase/>").unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), "<codebase/>");
    }

    #[test]
    fn write_failures_surface_as_file_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write_to_file(&blocker.join("out.xml"), "<codebase/>").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::FileWrite { path, .. }) if path == &blocker
        ));
    }
}
