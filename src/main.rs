use anyhow::Context;
use clap::Parser;
use netsweep::cli::{Args, OutputFormat};
use netsweep::logging::{self, LogConfig};
use netsweep::output;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.settings().context("failed to load settings")?;

    logging::init(
        &LogConfig::new()
            .level(settings.log_level.as_str())
            .verbosity(args.verbose, args.quiet),
    );

    let summary = args.execute(&settings).await?;

    if summary.idle_timed_out && !args.quiet {
        output::print_warning(&format!(
            "scan went idle, {} results were not written and {} hosts were skipped",
            summary.dropped, summary.skipped_hosts
        ));
    }

    if !args.quiet || args.summary == OutputFormat::Json {
        output::print_results(&summary, args.summary)?;
    }

    if !args.quiet {
        output::print_info(&format!("Results written to {}", args.output.display()));
    }

    Ok(())
}
