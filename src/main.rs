use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pfind::cli::{Cli, Config};
use pfind::output::{format_bytes, format_entry};
use pfind::platform::install_ctrl_c_handler;
use pfind::progress::StatusLine;
use pfind::scanner::{ScanSinks, scan};
use pfind::stats::StatsSnapshot;
use pfind::writer::TeeWriter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli(cli).context("failed to build configuration")?;

    let cancel = Arc::new(AtomicBool::new(false));
    install_ctrl_c_handler(Arc::clone(&cancel));

    let mut out = TeeWriter::new(io::stdout().lock(), config.out_file.clone());
    let mut errors = TeeWriter::new(io::stderr(), Some(config.error_log.clone()));
    let mut status = StatusLine::default();

    for root in &config.roots {
        eprintln!("scanning [{}]", root.display());
    }

    let show_progress = config.progress;
    let print_format = config.print_format;
    let snapshot = scan(
        config.roots.clone(),
        config.scan.clone(),
        Arc::clone(&cancel),
        &mut ScanSinks {
            on_match: &mut |entry| {
                let _ = out.write_line(&format_entry(&entry, print_format));
            },
            on_error: &mut |code, path| {
                let _ = errors.write_line(&format!("rc {code}\t{}", path.display()));
            },
            on_progress: &mut |line| {
                if show_progress {
                    status.set(line);
                }
            },
        },
    )
    .context("scan failed")?;

    status.clear();
    out.flush().context("failed to flush output")?;
    if let Some(error) = out.take_error() {
        return Err(anyhow::Error::new(error).context("failed to write matched output"));
    }
    if let Some(error) = errors.take_error() {
        eprintln!("warning: could not write the error log: {error}");
    }

    if cancel.load(Ordering::Relaxed) {
        eprintln!("cancelled. statistics cover the work done so far.");
    }
    write_summary(&snapshot);
    if errors.has_written_file() {
        eprintln!("\nerrors were logged to [{}]", config.error_log.display());
    }

    Ok(())
}

fn write_summary(snapshot: &StatsSnapshot) {
    eprintln!(
        "dirs/files     {}/{} ({})",
        snapshot.all_dirs,
        snapshot.all_files,
        format_bytes(snapshot.all_bytes)
    );
    eprintln!(
        "files matched  {} ({})",
        snapshot.matched_files,
        format_bytes(snapshot.matched_bytes)
    );
    if let Some(longest) = &snapshot.longest_name {
        eprintln!("longest name   {} ({} chars)", longest.name, longest.length);
    }
}
