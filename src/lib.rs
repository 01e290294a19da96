pub mod codec;
pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod parse;
pub mod resource;
pub mod run;
pub mod vendor;

pub type MetricKey = String;
/// Whole seconds since the Unix epoch.
pub type Time = i64;

/// Intraday activity values are integers, body values are floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}
impl core::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            // `{:?}` keeps the fractional part: `70.0` rather than `70`
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: Time,
    pub value: MetricValue,
}

/// Samples of one resource in vendor order. Every sample carries the batch key as its name.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBatch {
    key: MetricKey,
    samples: Vec<Sample>,
}
impl MetricBatch {
    pub fn new(key: MetricKey, samples: Vec<Sample>) -> Self {
        Self { key, samples }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
