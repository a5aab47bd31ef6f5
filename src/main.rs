use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use cwire::config::{Args, Output, RunConfig};
use cwire::report::{write_report, write_report_file};
use cwire::{aggregate, RecordFeed};

fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    let config = RunConfig::try_from(args)?;

    let mut feed = RecordFeed::from_path(&config.input)?;
    let summary = aggregate(feed.by_ref(), &config.filter())
        .with_context(|| format!("aggregation over {} failed", config.input.display()))?;
    if feed.skipped() > 0 {
        warn!(skipped = feed.skipped(), "skipped malformed records");
    }

    match &config.output {
        Output::Stdout => write_report(
            io::stdout().lock(),
            config.tier,
            config.category,
            &summary.index,
        )
        .context("cannot write report to stdout")?,
        Output::Directory(dir) => {
            let path = write_report_file(
                dir,
                config.tier,
                config.category,
                config.plant,
                &summary.index,
            )?;
            info!(path = %path.display(), stations = summary.index.len(), "report written");
        }
    }

    let released = summary.index.teardown();
    debug!(released, "station index released");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_directive());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
