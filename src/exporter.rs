use std::{io::Write, net::TcpStream};

use tracing::debug;

use crate::{
    codec::{encode_frame, encode_samples, CodecError},
    config::SinkTarget,
    error::SinkError,
    MetricBatch,
};

/// Database written by the line protocol exporter.
pub const LINE_PROTOCOL_DB: &str = "graphite";
const NANOS_PER_SECOND: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Graphite pickle receiver over TCP
    Pickle,
    /// InfluxDB `/write` endpoint over HTTP
    LineProtocol,
}
impl core::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pickle => f.write_str("graphite"),
            Self::LineProtocol => f.write_str("influxdb"),
        }
    }
}

pub trait MetricSink {
    fn kind(&self) -> SinkKind;
    /// Blocking I/O. An empty batch is still sent.
    fn send(&self, batch: &MetricBatch) -> Result<(), SinkError>;
}

pub fn build_sink(kind: SinkKind, target: SinkTarget) -> Box<dyn MetricSink> {
    match kind {
        SinkKind::Pickle => Box::new(PickleExporter::new(target)),
        SinkKind::LineProtocol => Box::new(LineProtocolExporter::new(target)),
    }
}

/// One TCP connection per batch, closed after the frame is written.
#[derive(Debug)]
pub struct PickleExporter {
    target: SinkTarget,
}
impl PickleExporter {
    pub fn new(target: SinkTarget) -> Self {
        Self { target }
    }

    /// Length-prefixed pickle of `[(prefix.name, (time, value)), ...]`.
    pub fn encode(&self, batch: &MetricBatch) -> Result<Vec<u8>, CodecError> {
        let key = self.target.prefixed(batch.key());
        let mut payload = vec![];
        encode_samples(&mut payload, &key, batch.samples())?;
        encode_frame(&payload)
    }
}
impl MetricSink for PickleExporter {
    fn kind(&self) -> SinkKind {
        SinkKind::Pickle
    }

    fn send(&self, batch: &MetricBatch) -> Result<(), SinkError> {
        let kind = self.kind();
        let frame = self
            .encode(batch)
            .map_err(|source| SinkError::Encode { kind, source })?;
        let transport = |e: std::io::Error| SinkError::Transport {
            kind,
            detail: format!("{}:{}: {e}", self.target.host, self.target.port),
        };
        let mut stream =
            TcpStream::connect((self.target.host.as_str(), self.target.port)).map_err(transport)?;
        stream.write_all(&frame).map_err(transport)?;
        stream.flush().map_err(transport)?;
        debug!(
            key = batch.key(),
            samples = batch.len(),
            bytes = frame.len(),
            "sent pickle frame"
        );
        Ok(())
    }
}

/// Posts newline-delimited line protocol to `/write?db=graphite`.
#[derive(Debug)]
pub struct LineProtocolExporter {
    target: SinkTarget,
    client: ureq::Agent,
    url: String,
}
impl LineProtocolExporter {
    pub fn new(target: SinkTarget) -> Self {
        let client = ureq::Agent::new();
        let url = format!(
            "http://{}:{}/write?db={LINE_PROTOCOL_DB}",
            target.host, target.port
        );
        Self {
            target,
            client,
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `prefix.name,tags value=v time_ns` per sample, in batch order.
    ///
    /// Tags are written as given, without escaping.
    pub fn encode(&self, batch: &MetricBatch) -> String {
        let mut series = self.target.prefixed(batch.key());
        if !self.target.tags.is_empty() {
            series.push(',');
            series.push_str(&self.target.tags.join(","));
        }
        let lines: Vec<String> = batch
            .samples()
            .iter()
            .map(|sample| {
                let nanos = sample.time.saturating_mul(NANOS_PER_SECOND);
                format!("{series} value={} {nanos}", sample.value)
            })
            .collect();
        lines.join("\n")
    }
}
impl MetricSink for LineProtocolExporter {
    fn kind(&self) -> SinkKind {
        SinkKind::LineProtocol
    }

    fn send(&self, batch: &MetricBatch) -> Result<(), SinkError> {
        let kind = self.kind();
        let payload = self.encode(batch);
        let response = match self
            .client
            .post(&self.url)
            .set("Content-Type", "text/plain; charset=utf-8")
            .send_string(&payload)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(SinkError::Status { kind, status, body });
            }
            Err(e) => {
                return Err(SinkError::Transport {
                    kind,
                    detail: e.to_string(),
                })
            }
        };
        let status = response.status();
        if status != 204 {
            let body = response.into_string().unwrap_or_default();
            return Err(SinkError::Status { kind, status, body });
        }
        debug!(
            key = batch.key(),
            samples = batch.len(),
            bytes = payload.len(),
            "posted line protocol"
        );
        Ok(())
    }
}
