use std::path::PathBuf;

use thiserror::Error;

use crate::{codec::CodecError, exporter::SinkKind, resource::Resource};

/// Failure talking to the vendor API
#[derive(Debug, Error)]
pub enum VendorError {
    /// The API answered with something other than 200
    #[error("Unable to get {resource}: HTTP {status}\n{body}")]
    Status {
        resource: Resource,
        status: u16,
        body: String,
    },
    #[error("Unable to get {resource}: {detail}")]
    Transport { resource: Resource, detail: String },
    #[error("Unable to decode {resource} response: {detail}")]
    Decode { resource: Resource, detail: String },
}

/// Vendor JSON did not have the expected shape
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{resource}: missing key `{key}`")]
    MissingKey { resource: Resource, key: String },
    #[error("{resource}: invalid `{key}`: {detail}")]
    InvalidField {
        resource: Resource,
        key: String,
        detail: String,
    },
}
impl ParseError {
    pub fn resource(&self) -> Resource {
        match self {
            Self::MissingKey { resource, .. } | Self::InvalidField { resource, .. } => *resource,
        }
    }
    pub fn key(&self) -> &str {
        match self {
            Self::MissingKey { key, .. } | Self::InvalidField { key, .. } => key,
        }
    }
}

/// Failure encoding or delivering a batch
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Unable to send {kind} data: {detail}")]
    Transport { kind: SinkKind, detail: String },
    #[error("Unable to send {kind} data: HTTP {status}\n{body}")]
    Status {
        kind: SinkKind,
        status: u16,
        body: String,
    },
    #[error("Unable to encode {kind} data")]
    Encode {
        kind: SinkKind,
        #[source]
        source: CodecError,
    },
}

/// Everything that can end one resource's export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Vendor(#[from] VendorError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Invalid startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid address `{0}`, expected host:port")]
    Address(String),
    #[error("Invalid tag `{0}`, expected key=value")]
    Tag(String),
    #[error("Invalid period `{0}`, expected one of 1d, 7d, 30d, 1w, 1m, 3m, 6m, 1y, max")]
    Period(String),
    #[error("Invalid date `{0}`, expected YYYY-MM-DD or today")]
    Date(String),
    #[error("No sink selected, expected --graphite or --influx")]
    NoSink,
    #[error("No resources selected")]
    NoResources,
    #[error("No access token: set FITBIT_ACCESS_TOKEN or store one in {}", .0.display())]
    MissingCredentials(PathBuf),
    #[error("Unable to access credential store {}", .path.display())]
    CredentialStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed credential store {}", .path.display())]
    CredentialFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unable to locate the home directory")]
    NoHome,
}
