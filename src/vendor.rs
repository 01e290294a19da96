//! Fitbit Web API client.
//!
//! Requests carry a bearer token obtained elsewhere; this client never runs the
//! OAuth2 handshake and never retries.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::Period,
    error::VendorError,
    resource::{Granularity, Resource},
};

pub const FITBIT_API_BASE: &str = "https://api.fitbit.com/1/user/-";
/// Intraday series cover a single day.
const INTRADAY_PERIOD: Period = Period::OneDay;
const USER_AGENT: &str = concat!("fitbit-exporter/", env!("CARGO_PKG_VERSION"));

/// Source of raw time series JSON.
pub trait MetricSource {
    fn activity(
        &self,
        resource: Resource,
        granularity: Granularity,
        date: NaiveDate,
    ) -> Result<Value, VendorError>;
    fn body(&self, resource: Resource, date: NaiveDate, period: Period)
        -> Result<Value, VendorError>;
}

pub struct FitbitClient {
    client: ureq::Agent,
    api_base: String,
    access_token: String,
}
impl core::fmt::Debug for FitbitClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FitbitClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}
impl FitbitClient {
    pub fn new(api_base: impl Into<String>, access_token: impl Into<String>) -> Self {
        let client = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
        let api_base = api_base.into().trim_end_matches('/').to_owned();
        Self {
            client,
            api_base,
            access_token: access_token.into(),
        }
    }

    pub fn activity_url(
        &self,
        resource: Resource,
        granularity: Granularity,
        date: NaiveDate,
    ) -> String {
        format!(
            "{}/activities/{resource}/date/{}/{INTRADAY_PERIOD}/{}.json",
            self.api_base,
            date.format("%Y-%m-%d"),
            granularity.as_str()
        )
    }

    pub fn body_url(&self, resource: Resource, date: NaiveDate, period: Period) -> String {
        format!(
            "{}/body/{resource}/date/{}/{period}.json",
            self.api_base,
            date.format("%Y-%m-%d")
        )
    }

    /// Blocking I/O
    fn get(&self, resource: Resource, url: &str) -> Result<Value, VendorError> {
        debug!(%resource, url, "requesting time series");
        let response = match self
            .client
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                debug!(%resource, status, url, body_length = body.len(), "vendor request failed");
                return Err(VendorError::Status {
                    resource,
                    status,
                    body,
                });
            }
            Err(e) => {
                return Err(VendorError::Transport {
                    resource,
                    detail: e.to_string(),
                })
            }
        };
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| VendorError::Transport {
                resource,
                detail: e.to_string(),
            })?;
        if status != 200 {
            return Err(VendorError::Status {
                resource,
                status,
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| VendorError::Decode {
            resource,
            detail: e.to_string(),
        })
    }
}
impl MetricSource for FitbitClient {
    fn activity(
        &self,
        resource: Resource,
        granularity: Granularity,
        date: NaiveDate,
    ) -> Result<Value, VendorError> {
        self.get(resource, &self.activity_url(resource, granularity, date))
    }

    fn body(
        &self,
        resource: Resource,
        date: NaiveDate,
        period: Period,
    ) -> Result<Value, VendorError> {
        self.get(resource, &self.body_url(resource, date, period))
    }
}
