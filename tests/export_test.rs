use std::cell::RefCell;

use chrono::{NaiveDate, Utc};
use fitbit_exporter::{
    config::Period,
    error::{ExportError, ParseError, SinkError, VendorError},
    exporter::{MetricSink, SinkKind},
    resource::{Granularity, Resource},
    run::{export_resource, export_resources},
    vendor::MetricSource,
    MetricBatch,
};
use serde_json::{json, Value};

/// Serves canned responses; resources listed in `failing` answer 500.
#[derive(Default)]
struct StubSource {
    failing: Vec<Resource>,
    requests: RefCell<Vec<(Resource, Option<Granularity>, Period)>>,
}
impl StubSource {
    fn failing(resources: &[Resource]) -> Self {
        Self {
            failing: resources.to_vec(),
            ..Self::default()
        }
    }

    fn respond(&self, resource: Resource, raw: Value) -> Result<Value, VendorError> {
        if self.failing.contains(&resource) {
            return Err(VendorError::Status {
                resource,
                status: 500,
                body: "unavailable".into(),
            });
        }
        Ok(raw)
    }
}
impl MetricSource for StubSource {
    fn activity(
        &self,
        resource: Resource,
        granularity: Granularity,
        date: NaiveDate,
    ) -> Result<Value, VendorError> {
        self.requests
            .borrow_mut()
            .push((resource, Some(granularity), Period::OneDay));
        let name = resource.name();
        self.respond(
            resource,
            json!({
                format!("activities-{name}"): [{ "dateTime": date.to_string() }],
                format!("activities-{name}-intraday"): {
                    "dataset": [
                        { "time": "00:00:00", "value": 1 },
                        { "time": "00:01:00", "value": 2 },
                    ]
                }
            }),
        )
    }

    fn body(
        &self,
        resource: Resource,
        date: NaiveDate,
        period: Period,
    ) -> Result<Value, VendorError> {
        self.requests.borrow_mut().push((resource, None, period));
        self.respond(
            resource,
            json!({
                format!("body-{resource}"): [{ "dateTime": date.to_string(), "value": "21.5" }]
            }),
        )
    }
}

#[derive(Default)]
struct RecordingSink {
    sent: RefCell<Vec<MetricBatch>>,
    reject: Option<&'static str>,
}
impl MetricSink for RecordingSink {
    fn kind(&self) -> SinkKind {
        SinkKind::LineProtocol
    }

    fn send(&self, batch: &MetricBatch) -> Result<(), SinkError> {
        if self.reject == Some(batch.key()) {
            return Err(SinkError::Status {
                kind: self.kind(),
                status: 500,
                body: String::new(),
            });
        }
        self.sent.borrow_mut().push(batch.clone());
        Ok(())
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn sent_keys(sink: &RecordingSink) -> Vec<String> {
    sink.sent
        .borrow()
        .iter()
        .map(|batch| batch.key().to_owned())
        .collect()
}

#[test]
fn vendor_failure_does_not_stop_later_resources() {
    let source = StubSource::failing(&[Resource::Heart]);
    let sink = RecordingSink::default();
    export_resources(
        &source,
        &sink,
        &[Resource::Heart, Resource::Steps],
        date(),
        Period::OneDay,
        &Utc,
    );

    assert_eq!(sent_keys(&sink), ["steps"]);
    assert_eq!(sink.sent.borrow()[0].len(), 2);
    assert_eq!(source.requests.borrow().len(), 2);
}

#[test]
fn sink_failure_does_not_stop_later_resources() {
    let source = StubSource::default();
    let sink = RecordingSink {
        reject: Some("weight"),
        ..RecordingSink::default()
    };
    export_resources(
        &source,
        &sink,
        &[Resource::Weight, Resource::Fat, Resource::Bmi],
        date(),
        Period::SevenDays,
        &Utc,
    );
    assert_eq!(sent_keys(&sink), ["fat", "bmi"]);
}

#[test]
fn resources_are_exported_in_order_with_their_endpoint() {
    let source = StubSource::default();
    let sink = RecordingSink::default();
    export_resources(
        &source,
        &sink,
        &[Resource::Heart, Resource::Distance, Resource::Weight],
        date(),
        Period::ThirtyDays,
        &Utc,
    );

    assert_eq!(sent_keys(&sink), ["heart", "distance", "weight"]);
    assert_eq!(
        *source.requests.borrow(),
        [
            (Resource::Heart, Some(Granularity::OneSecond), Period::OneDay),
            (Resource::Distance, Some(Granularity::OneMinute), Period::OneDay),
            (Resource::Weight, None, Period::ThirtyDays),
        ]
    );
}

/// Answers every request with the same JSON.
struct FixedSource(Value);
impl MetricSource for FixedSource {
    fn activity(&self, _: Resource, _: Granularity, _: NaiveDate) -> Result<Value, VendorError> {
        Ok(self.0.clone())
    }
    fn body(&self, _: Resource, _: NaiveDate, _: Period) -> Result<Value, VendorError> {
        Ok(self.0.clone())
    }
}

#[test]
fn malformed_response_is_parse_error() {
    let source = FixedSource(json!({
        "activities-heart": [{ "dateTime": "2024-01-15" }]
    }));
    let sink = RecordingSink::default();
    let err = export_resource(&source, &sink, Resource::Heart, date(), Period::OneDay, &Utc)
        .unwrap_err();
    match err {
        ExportError::Parse(ParseError::MissingKey { resource, key }) => {
            assert_eq!(resource, Resource::Heart);
            assert_eq!(key, "activities-heart-intraday");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(sink.sent.borrow().is_empty());
}

#[test]
fn empty_dataset_is_still_sent() {
    let source = FixedSource(json!({
        "activities-calories": [{ "dateTime": "2024-01-15" }],
        "activities-calories-intraday": { "dataset": [] }
    }));
    let sink = RecordingSink::default();
    let samples =
        export_resource(&source, &sink, Resource::Calories, date(), Period::OneDay, &Utc).unwrap();
    assert_eq!(samples, 0);
    assert_eq!(sent_keys(&sink), ["calories"]);
}
