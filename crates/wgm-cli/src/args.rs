//! Command-line flags and how they layer over the config file.

use clap::Parser;
use std::path::PathBuf;

use wgm_core::{Dialect, MigrateError, MigrationConfig};

#[derive(Parser, Debug, Clone)]
#[clap(name = "wgm", version, about = "Migrate exported Wavefront dashboards and alerts to Grafana")]
pub struct Args {
    /// Exported Wavefront JSON file, or a directory of them.
    #[clap(long, short)]
    pub input: PathBuf,

    /// Directory for the generated Grafana documents.
    #[clap(long, short, default_value = "grafana_output")]
    pub output: PathBuf,

    /// Target datasource: prometheus, influxdb, elasticsearch or unsupported.
    #[clap(long)]
    pub dialect: Option<Dialect>,

    /// Grafana datasource uid for every panel and alert query.
    #[clap(long)]
    pub datasource_uid: Option<String>,

    /// Range window for rate(), deriv() and last().
    #[clap(long)]
    pub rate_window: Option<String>,

    /// InfluxQL GROUP BY time() bucket.
    #[clap(long)]
    pub influx_interval: Option<String>,

    /// Alert rule group name [default: Wavefront Alerts]
    #[clap(long)]
    pub alert_group_name: Option<String>,

    /// Alert folder [default: Wavefront Migration]
    #[clap(long)]
    pub alert_folder: Option<String>,

    /// Rule group evaluation interval [default: 60s]
    #[clap(long)]
    pub alert_interval: Option<String>,

    /// YAML settings file, see config/mappings.yaml.
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(long)]
    pub skip_dashboards: bool,

    #[clap(long)]
    pub skip_alerts: bool,

    /// Only migrate these dashboard ids.
    #[clap(long, num_args = 1..)]
    pub dashboards: Vec<String>,

    /// Only migrate these alert ids.
    #[clap(long, num_args = 1..)]
    pub alerts: Vec<String>,
}

impl Args {
    /// Config file, then `WGM_*` environment, then flags. Validated.
    pub fn resolve_config(&self) -> Result<MigrationConfig, MigrateError> {
        let mut config = match &self.config {
            Some(path) => MigrationConfig::load(&path.to_string_lossy())?,
            None => MigrationConfig::default(),
        };
        config.apply_env()?;
        self.apply_flags(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_flags(&self, config: &mut MigrationConfig) {
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        let overrides = [
            (&self.datasource_uid, &mut config.datasource_uid),
            (&self.rate_window, &mut config.rate_window),
            (&self.influx_interval, &mut config.influx_interval),
            (&self.alert_group_name, &mut config.alert_group),
            (&self.alert_folder, &mut config.alert_folder),
            (&self.alert_interval, &mut config.evaluation_interval),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }
    }

    pub fn selection(&self) -> Selection {
        Selection {
            skip_dashboards: self.skip_dashboards,
            skip_alerts: self.skip_alerts,
            dashboard_ids: self.dashboards.clone(),
            alert_ids: self.alerts.clone(),
        }
    }
}

/// Which source documents to migrate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub skip_dashboards: bool,
    pub skip_alerts: bool,
    /// Empty means all.
    pub dashboard_ids: Vec<String>,
    pub alert_ids: Vec<String>,
}

impl Selection {
    pub fn keeps_dashboard(&self, id: &str) -> bool {
        !self.skip_dashboards && (self.dashboard_ids.is_empty() || self.dashboard_ids.iter().any(|d| d == id))
    }

    pub fn keeps_alert(&self, id: &str) -> bool {
        !self.skip_alerts && (self.alert_ids.is_empty() || self.alert_ids.iter().any(|a| a == id))
    }
}
