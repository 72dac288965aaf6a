//! Plain text terminal output.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::{Admission, ScanSummary};
use console::style;
use std::io::{self, Write};
use std::path::Path;

/// Print the run summary in human-readable form.
pub fn print_plain(summary: &ScanSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(
        out,
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    )?;
    writeln!(out, "                    {} Summary", style("netsweep").cyan().bold())?;
    writeln!(
        out,
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {} targets, {} hosts in {:.2}s",
        style("Scanned:").bold(),
        summary.targets,
        summary.hosts,
        summary.duration_ms as f64 / 1000.0
    )?;
    writeln!(
        out,
        "  {} {} open, {} closed",
        style("Ports:").bold(),
        style(summary.open).green().bold(),
        style(summary.closed).red()
    )?;
    writeln!(
        out,
        "  {} {} lines written",
        style("Log:").bold(),
        summary.lines_written
    )?;
    writeln!(
        out,
        "  {} {} → {}",
        style("Window:").bold(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.finished_at.format("%H:%M:%S UTC")
    )?;

    if summary.idle_timed_out {
        writeln!(out)?;
        writeln!(
            out,
            "  {} result log closed on idle timeout, {} results were not written",
            style("!").yellow().bold(),
            summary.dropped
        )?;
        if summary.skipped_hosts > 0 {
            writeln!(
                out,
                "  {} {} hosts were never scanned",
                style("!").yellow().bold(),
                summary.skipped_hosts
            )?;
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(
    input: &Path,
    output: &Path,
    ports: usize,
    threads: usize,
    admission: Admission,
) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("netsweep").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Targets: {}",
        style("•").dim(),
        style(input.display()).white().bold()
    );
    println!(
        "{} Ports per host: {}",
        style("•").dim(),
        style(ports).white().bold()
    );
    println!(
        "{} Threads: {} ({} admission)",
        style("•").dim(),
        style(threads).yellow(),
        admission
    );
    println!("{} Results: {}", style("•").dim(), output.display());
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}
