use chrono::NaiveDate;
use serde_json::Value;

use crate::{
    config::Period,
    error::{ParseError, VendorError},
    parse::{self, CalendarZone},
    vendor::MetricSource,
    MetricBatch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Heart,
    Steps,
    Floors,
    Calories,
    Elevation,
    Distance,
    Weight,
    Fat,
    Bmi,
}

pub const ACTIVITIES: [Resource; 6] = [
    Resource::Heart,
    Resource::Steps,
    Resource::Floors,
    Resource::Calories,
    Resource::Elevation,
    Resource::Distance,
];
pub const BODY: [Resource; 3] = [Resource::Weight, Resource::Fat, Resource::Bmi];

impl Resource {
    pub fn name(self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Steps => "steps",
            Self::Floors => "floors",
            Self::Calories => "calories",
            Self::Elevation => "elevation",
            Self::Distance => "distance",
            Self::Weight => "weight",
            Self::Fat => "fat",
            Self::Bmi => "bmi",
        }
    }

    pub fn kind(self) -> ResourceKind {
        match self {
            Self::Heart => ResourceKind::Activity(Granularity::OneSecond),
            Self::Steps | Self::Floors | Self::Calories | Self::Elevation | Self::Distance => {
                ResourceKind::Activity(Granularity::OneMinute)
            }
            Self::Weight | Self::Fat | Self::Bmi => ResourceKind::Body,
        }
    }
}
impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Intraday sampling interval of an activity series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    OneSecond,
    OneMinute,
}
impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneSecond => "1sec",
            Self::OneMinute => "1min",
        }
    }
}

/// Selects the vendor endpoint and the parse routine of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Activity(Granularity),
    Body,
}
impl ResourceKind {
    pub fn fetch(
        self,
        source: &dyn MetricSource,
        resource: Resource,
        date: NaiveDate,
        period: Period,
    ) -> Result<Value, VendorError> {
        match self {
            Self::Activity(granularity) => source.activity(resource, granularity, date),
            Self::Body => source.body(resource, date, period),
        }
    }

    pub fn parse(
        self,
        resource: Resource,
        raw: &Value,
        zone: &dyn CalendarZone,
    ) -> Result<MetricBatch, ParseError> {
        match self {
            Self::Activity(_) => parse::activity_intraday(resource, raw, zone),
            Self::Body => parse::body_daily(resource, raw, zone),
        }
    }
}

/// Resources to export, activities first, each in its fixed order.
///
/// `all` selects everything and `body` selects every body resource.
pub fn select(all: bool, body: bool, activities: &[Resource]) -> Vec<Resource> {
    let activities = ACTIVITIES
        .into_iter()
        .filter(|resource| all || activities.contains(resource));
    let body = BODY.into_iter().filter(|_| all || body);
    activities.chain(body).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heart_is_sampled_per_second() {
        assert_eq!(
            Resource::Heart.kind(),
            ResourceKind::Activity(Granularity::OneSecond)
        );
        for resource in &ACTIVITIES[1..] {
            assert_eq!(
                resource.kind(),
                ResourceKind::Activity(Granularity::OneMinute)
            );
        }
        for resource in BODY {
            assert_eq!(resource.kind(), ResourceKind::Body);
        }
    }

    #[test]
    fn selection_keeps_fixed_order() {
        let selected = select(false, true, &[Resource::Distance, Resource::Heart]);
        assert_eq!(
            selected,
            vec![
                Resource::Heart,
                Resource::Distance,
                Resource::Weight,
                Resource::Fat,
                Resource::Bmi,
            ]
        );
    }

    #[test]
    fn all_selects_everything() {
        let selected = select(true, false, &[]);
        assert_eq!(selected.len(), 9);
        assert_eq!(selected[0], Resource::Heart);
        assert_eq!(selected[8], Resource::Bmi);
    }

    #[test]
    fn nothing_selected() {
        assert!(select(false, false, &[]).is_empty());
    }
}
