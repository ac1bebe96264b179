//! Binary entrypoint for `wgm`.
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use wgm_cli::{configure_tracing, run_migration, Args, JsonDirWriter, JsonSourceReader};

#[tokio::main]
async fn main() -> Result<()> {
    configure_tracing();
    let args = Args::parse();

    let config = args.resolve_config().context("invalid migration settings")?;
    let reader = JsonSourceReader::new(&args.input);
    let writer = JsonDirWriter::create(&args.output)?;
    info!(input = %args.input.display(), output = %writer.dir().display(), dialect = %config.dialect, "starting migration");

    let report = run_migration(&config, &args.selection(), &reader, &writer).await?;

    info!(
        dashboards = report.dashboards.total,
        panels = report.dashboards.total_panels,
        degraded_panels = report.dashboards.degraded_panels.len(),
        rules = report.alerts.total_rules,
        flagged_rules = report.alerts.flagged_rules.len(),
        "migration finished"
    );
    if report.needs_review() {
        warn!(report = %writer.dir().join(wgm_cli::REPORT_FILE).display(), "some panels or rules need manual review");
    }
    Ok(())
}
