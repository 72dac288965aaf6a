//! JSON output formatting.

use crate::scanner::ScanSummary;
use std::io;

/// Print the run summary as JSON.
pub fn print_json(summary: &ScanSummary) -> io::Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    println!("{}", json);
    Ok(())
}
