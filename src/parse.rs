//! Normalizes vendor time series into [`MetricBatch`]es.
//!
//! Two response shapes exist. Intraday activity:
//!
//! ```json
//! {
//!   "activities-steps": [{ "dateTime": "2024-01-15", "value": "8021" }],
//!   "activities-steps-intraday": { "dataset": [{ "time": "00:01:00", "value": 12 }] }
//! }
//! ```
//!
//! Daily body:
//!
//! ```json
//! { "body-weight": [{ "dateTime": "2024-01-15", "value": "70.5" }] }
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde_json::Value;

use crate::{error::ParseError, resource::Resource, MetricBatch, MetricValue, Sample, Time};

/// Converts wall-clock calendar time to epoch seconds.
pub trait CalendarZone {
    /// `None` when the wall-clock time does not exist in this zone.
    fn epoch(&self, local: NaiveDateTime) -> Option<Time>;
}
impl<Tz: TimeZone> CalendarZone for Tz {
    fn epoch(&self, local: NaiveDateTime) -> Option<Time> {
        self.from_local_datetime(&local)
            .earliest()
            .map(|instant| instant.timestamp())
    }
}

pub fn activity_intraday(
    resource: Resource,
    raw: &Value,
    zone: &dyn CalendarZone,
) -> Result<MetricBatch, ParseError> {
    let summary_key = format!("activities-{resource}");
    let summary = field(resource, raw, &summary_key)?;
    let first = summary.get(0).ok_or_else(|| ParseError::MissingKey {
        resource,
        key: format!("{summary_key}[0]"),
    })?;
    let day = parse_date(resource, str_field(resource, first, "dateTime")?)?;

    let intraday = field(resource, raw, &format!("activities-{resource}-intraday"))?;
    let dataset = array(resource, field(resource, intraday, "dataset")?, "dataset")?;

    let mut samples = Vec::with_capacity(dataset.len());
    for entry in dataset {
        let time = parse_time(resource, str_field(resource, entry, "time")?)?;
        let time = epoch(resource, zone, day.and_time(time), "time")?;
        let value = integer_value(resource, field(resource, entry, "value")?)?;
        samples.push(Sample {
            time,
            value: MetricValue::Integer(value),
        });
    }
    Ok(MetricBatch::new(resource.name().to_owned(), samples))
}

pub fn body_daily(
    resource: Resource,
    raw: &Value,
    zone: &dyn CalendarZone,
) -> Result<MetricBatch, ParseError> {
    let key = format!("body-{resource}");
    let series = array(resource, field(resource, raw, &key)?, &key)?;

    let mut samples = Vec::with_capacity(series.len());
    for entry in series {
        let day = parse_date(resource, str_field(resource, entry, "dateTime")?)?;
        let time = epoch(resource, zone, day.and_time(NaiveTime::MIN), "dateTime")?;
        let value = float_value(resource, field(resource, entry, "value")?)?;
        samples.push(Sample {
            time,
            value: MetricValue::Float(value),
        });
    }
    Ok(MetricBatch::new(resource.name().to_owned(), samples))
}

fn field<'a>(resource: Resource, value: &'a Value, key: &str) -> Result<&'a Value, ParseError> {
    value.get(key).ok_or_else(|| ParseError::MissingKey {
        resource,
        key: key.to_owned(),
    })
}

fn str_field<'a>(resource: Resource, value: &'a Value, key: &str) -> Result<&'a str, ParseError> {
    field(resource, value, key)?
        .as_str()
        .ok_or_else(|| invalid(resource, key, "expected a string"))
}

fn array<'a>(resource: Resource, value: &'a Value, key: &str) -> Result<&'a [Value], ParseError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(resource, key, "expected an array"))
}

fn invalid(resource: Resource, key: &str, detail: impl Into<String>) -> ParseError {
    ParseError::InvalidField {
        resource,
        key: key.to_owned(),
        detail: detail.into(),
    }
}

fn parse_date(resource: Resource, s: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| invalid(resource, "dateTime", format!("`{s}`: {e}")))
}

/// Fractional seconds, if present, are dropped.
fn parse_time(resource: Resource, s: &str) -> Result<NaiveTime, ParseError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S%.f"))
        .map_err(|e| invalid(resource, "time", format!("`{s}`: {e}")))
}

fn epoch(
    resource: Resource,
    zone: &dyn CalendarZone,
    local: NaiveDateTime,
    key: &str,
) -> Result<Time, ParseError> {
    zone.epoch(local).ok_or_else(|| {
        invalid(
            resource,
            key,
            format!("`{local}` does not exist in local time"),
        )
    })
}

/// Floats, in JSON or in strings, are truncated toward zero.
fn integer_value(resource: Resource, value: &Value) -> Result<i64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };
    parsed.ok_or_else(|| invalid(resource, "value", format!("`{value}` is not an integer")))
}

fn float_value(resource: Resource, value: &Value) -> Result<f64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(resource, "value", format!("`{value}` is not a number")))
}
