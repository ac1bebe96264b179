//! WGM CLI: exported Wavefront JSON to Grafana JSON on disk.

pub mod args;
pub mod fs;
pub mod migrate;

pub use args::{Args, Selection};
pub use fs::{JsonDirWriter, JsonSourceReader, REPORT_FILE};
pub use migrate::run_migration;

use tracing::metadata::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` when set, otherwise info for the migrator's own crates.
pub fn configure_tracing() {
    let fmt_layer = fmt::layer().compact().with_target(true);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(std::env::var("RUST_LOG").unwrap_or_else(|_| "wgm=info".to_string()));

    tracing_subscriber::registry().with(fmt_layer).with(filter).init();
}
