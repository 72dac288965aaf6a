//! Output module.
//!
//! Opens the result log and prints run status to the terminal. The result
//! log itself is written by the scanner's sink; everything here is for the
//! person watching the scan.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{print_error, print_info, print_scan_header, print_warning};

use crate::cli::OutputFormat;
use crate::error::{InputError, InputResult};
use crate::scanner::ScanSummary;
use std::io;
use std::path::Path;
use tokio::fs::{File, OpenOptions};

/// Print the end-of-run summary in the requested format.
pub fn print_results(summary: &ScanSummary, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_plain(summary),
        OutputFormat::Json => json_format::print_json(summary),
    }
}

/// Open the result log, truncating it unless `append` is set.
pub async fn open_log(path: &Path, append: bool) -> InputResult<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }

    options.open(path).await.map_err(|source| InputError::OutputFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_open_log_truncates_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.log");
        std::fs::write(&path, "stale\n").unwrap();

        let mut file = open_log(&path, false).await.unwrap();
        file.write_all(b"10.0.0.1:80:Open\n").await.unwrap();
        file.flush().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "10.0.0.1:80:Open\n");
    }

    #[tokio::test]
    async fn test_open_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.log");
        std::fs::write(&path, "10.0.0.1:80:Open\n").unwrap();

        let mut file = open_log(&path, true).await.unwrap();
        file.write_all(b"10.0.0.1:81:Close\n").await.unwrap();
        file.flush().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "10.0.0.1:80:Open\n10.0.0.1:81:Close\n"
        );
    }

    #[tokio::test]
    async fn test_open_log_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.log");
        let err = open_log(&path, false).await.unwrap_err();
        assert!(matches!(err, InputError::OutputFailed { .. }));
    }
}
