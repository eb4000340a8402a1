//! Main entry point for the nuget-notices CLI application.
//!
//! Reads each archive given on the command line, then either lists its
//! members or prints the license-like (or `-i`-selected) members as text.
//! Up to `--jobs` archives are loaded and parsed concurrently; output keeps
//! argument order.

use anyhow::Result;
use clap::Parser;
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use nuget_notices::cli::Selection;
use nuget_notices::text::decode_text;
use nuget_notices::{Cli, LocalArchive, NullSink, StderrSink, WarningSink, ZipExtractor};

/// Application entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Arc::new(Cli::parse());

    // An unreadable archive aborts the run; content problems were only warnings.
    for task in spawn_archives(cli) {
        let report = task.await??;
        print!("{report}");
    }

    Ok(())
}

/// Start one task per archive, returning the handles in argument order.
///
/// A task holds its permit from the file read until the archive buffer is
/// dropped, so at most `cli.jobs()` archives are in memory at once.
fn spawn_archives(cli: Arc<Cli>) -> Vec<JoinHandle<Result<String>>> {
    let selection = Arc::new(cli.selection());
    let permits = Arc::new(Semaphore::new(cli.jobs()));

    cli.files
        .iter()
        .map(|file| {
            let path = PathBuf::from(file);
            let cli = Arc::clone(&cli);
            let selection = Arc::clone(&selection);
            let permits = Arc::clone(&permits);
            tokio::spawn(async move {
                let _permit = permits.acquire_owned().await?;
                let archive = LocalArchive::open(&path).await?;
                let report =
                    tokio::task::spawn_blocking(move || process_archive(&archive, &cli, &selection))
                        .await??;
                anyhow::Ok(report)
            })
        })
        .collect()
}

/// Parse one archive and render what the CLI asked for.
fn process_archive(archive: &LocalArchive, cli: &Cli, selection: &Selection) -> Result<String> {
    let sink: Box<dyn WarningSink> = if cli.is_quiet() {
        Box::new(NullSink)
    } else {
        Box::new(StderrSink::with_prefix(format!("{}: ", archive.path().display())))
    };
    let extractor = archive.extractor(sink.as_ref());

    let mut out = String::new();
    if !cli.is_very_quiet() {
        writeln!(out, "Archive:  {}", archive.path().display())?;
    }

    if cli.is_listing() {
        list_files(&mut out, &extractor, cli.verbose)?;
    } else {
        print_members(&mut out, &extractor, selection, sink.as_ref(), cli.is_very_quiet())?;
    }

    Ok(out)
}

/// List members of the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just member names, one per line
/// - Verbose format (`-v`): Table with sizes, method and timestamps
fn list_files(out: &mut impl fmt::Write, extractor: &ZipExtractor<'_>, verbose: bool) -> fmt::Result {
    let entries = extractor.list_files();

    if verbose {
        writeln!(
            out,
            "{:>10}  {:<7} {:>10}  {:>10}  {:>5}  Name",
            "Length", "Method", "Size", "Date", "Time"
        )?;
        writeln!(out, "{}", "-".repeat(70))?;
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        if !verbose {
            writeln!(out, "{}", entry.file_name)?;
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        writeln!(
            out,
            "{:>10}  {:<7} {:>10}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compression_method.label(),
            entry.compressed_size,
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        )?;

        if !entry.is_directory {
            total_uncompressed = total_uncompressed.saturating_add(entry.uncompressed_size);
            total_compressed = total_compressed.saturating_add(entry.compressed_size);
            file_count += 1;
        }
    }

    if verbose {
        writeln!(out, "{}", "-".repeat(70))?;
        writeln!(
            out,
            "{:>10}  {:<7} {:>10}  {:>19}  {} files",
            total_uncompressed, "", total_compressed, "", file_count
        )?;
    }

    Ok(())
}

/// Print each selected member as text, headed by its name.
fn print_members(
    out: &mut impl fmt::Write,
    extractor: &ZipExtractor<'_>,
    selection: &Selection,
    sink: &dyn WarningSink,
    bare: bool,
) -> fmt::Result {
    for member in extractor.extract_matching(selection, sink) {
        if !bare {
            writeln!(out, "--- {} ---", member.name)?;
        }
        let text = decode_text(&member.data);
        out.write_str(&text)?;
        if !text.ends_with('\n') {
            out.write_char('\n')?;
        }
    }
    Ok(())
}
