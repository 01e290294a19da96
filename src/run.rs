use chrono::NaiveDate;
use tracing::{error, info, info_span};

use crate::{
    config::Period,
    error::ExportError,
    exporter::MetricSink,
    parse::CalendarZone,
    resource::Resource,
    vendor::MetricSource,
};

/// Fetch, parse, and send each resource in turn.
///
/// A failing resource is logged and skipped; the remaining ones are still exported.
pub fn export_resources(
    source: &dyn MetricSource,
    sink: &dyn MetricSink,
    resources: &[Resource],
    date: NaiveDate,
    period: Period,
    zone: &dyn CalendarZone,
) {
    let mut failed = 0;
    for &resource in resources {
        let _span = info_span!("export", %resource).entered();
        match export_resource(source, sink, resource, date, period, zone) {
            Ok(samples) => info!(%resource, samples, sink = %sink.kind(), "exported"),
            Err(e) => {
                failed += 1;
                error!(%resource, "{e}");
            }
        }
    }
    info!(attempted = resources.len(), failed, %date, %period, "export finished");
}

pub fn export_resource(
    source: &dyn MetricSource,
    sink: &dyn MetricSink,
    resource: Resource,
    date: NaiveDate,
    period: Period,
    zone: &dyn CalendarZone,
) -> Result<usize, ExportError> {
    let kind = resource.kind();
    let raw = kind.fetch(source, resource, date, period)?;
    let batch = kind.parse(resource, &raw, zone)?;
    sink.send(&batch)?;
    Ok(batch.len())
}
