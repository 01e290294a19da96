//! Export one day (or period) of Fitbit metrics to Graphite or InfluxDB.
//!
//! ```bash
//! FITBIT_ACCESS_TOKEN=... fitbit-exporter --graphite localhost:2004 --all today
//! fitbit-exporter --influx localhost:8086 -t user=me --heart --body --period 7d 2024-01-15
//! ```

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser};
use fitbit_exporter::{
    config::{self, ExportConfig, Period, SinkTarget, DEFAULT_PREFIX},
    error::ConfigError,
    exporter::{build_sink, SinkKind},
    logging::LoggingConfig,
    resource::{self, Resource},
    run,
    vendor::{FitbitClient, FITBIT_API_BASE},
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "fitbit-exporter",
    version,
    about = "Export Fitbit activity and body metrics to Graphite or InfluxDB"
)]
struct Cli {
    #[command(flatten)]
    sink: SinkArgs,

    /// A tag for the storage system, if supported
    #[arg(short = 't', long = "tag", value_name = "key=value", value_parser = config::parse_tag)]
    tags: Vec<String>,

    /// Metric name prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Span of body series
    #[arg(long, default_value = "1d")]
    period: Period,

    /// Export all known types
    #[arg(long)]
    all: bool,
    /// Export weight, fat and bmi
    #[arg(long)]
    body: bool,
    #[arg(long)]
    heart: bool,
    #[arg(long)]
    steps: bool,
    #[arg(long)]
    floors: bool,
    #[arg(long)]
    calories: bool,
    #[arg(long)]
    elevation: bool,
    #[arg(long)]
    distance: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[arg(long, default_value = FITBIT_API_BASE, hide = true)]
    api_base: String,

    /// Start date, YYYY-MM-DD or `today`
    #[arg(value_parser = config::parse_date)]
    date: NaiveDate,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SinkArgs {
    /// Graphite pickle receiver, for example localhost:2004
    #[arg(long, value_name = "host:port")]
    graphite: Option<String>,
    /// InfluxDB host, for example localhost:8086
    #[arg(long, value_name = "host:port")]
    influx: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ExportConfig, ConfigError> {
        let (sink_kind, address) = match (self.sink.graphite, self.sink.influx) {
            (Some(address), _) => (SinkKind::Pickle, address),
            (None, Some(address)) => (SinkKind::LineProtocol, address),
            (None, None) => return Err(ConfigError::NoSink),
        };
        let (host, port) = config::parse_address(&address)?;

        let flags = [
            (Resource::Heart, self.heart),
            (Resource::Steps, self.steps),
            (Resource::Floors, self.floors),
            (Resource::Calories, self.calories),
            (Resource::Elevation, self.elevation),
            (Resource::Distance, self.distance),
        ];
        let activities: Vec<Resource> = flags
            .into_iter()
            .filter_map(|(resource, set)| set.then_some(resource))
            .collect();

        let config = ExportConfig {
            date: self.date,
            period: self.period,
            resources: resource::select(self.all, self.body, &activities),
            sink_kind,
            sink: SinkTarget {
                host,
                port,
                prefix: self.prefix,
                tags: self.tags,
            },
            api_base: self.api_base,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    LoggingConfig::from_env(cli.debug).init()?;
    let config = cli.into_config().context("invalid arguments")?;

    let home = config::exporter_home()?;
    let token = config::load_access_token(&home)?;
    let client = FitbitClient::new(config.api_base.as_str(), token);
    let sink = build_sink(config.sink_kind, config.sink.clone());

    info!(
        sink = %config.sink_kind,
        host = %config.sink.host,
        port = config.sink.port,
        resources = config.resources.len(),
        "starting export"
    );
    run::export_resources(
        &client,
        sink.as_ref(),
        &config.resources,
        config.date,
        config.period,
        &Local,
    );
    Ok(())
}
