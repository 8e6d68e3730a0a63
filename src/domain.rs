use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// Property codes consulted by the extractor and the resolver.
pub mod property {
    pub const COORDINATE_LOCATION: &str = "P625";
    pub const LOCATION: &str = "P276";
    pub const ADMIN_REGION: &str = "P131";
    pub const COUNTRY: &str = "P17";
    pub const CAPITAL: &str = "P36";
    pub const START_TIME: &str = "P580";
    pub const END_TIME: &str = "P582";
    pub const POINT_IN_TIME: &str = "P585";
}

const ENTITY_URI_MARKERS: [&str; 2] = ["/entity/", "/wiki/"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = TimelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let tail = ENTITY_URI_MARKERS
            .iter()
            .find_map(|marker| trimmed.rsplit_once(marker).map(|(_, tail)| tail))
            .unwrap_or(trimmed);
        let normalized = tail.trim_end_matches('/').to_uppercase();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !is_valid {
            return Err(TimelineError::InvalidEntityId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for EntityId {
    type Error = TimelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

/// A point in canonical (latitude, longitude) order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    Direct,
    Location,
    AdminRegion,
    CapitalFallback,
    None,
}

impl CoordinateSource {
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            CoordinateSource::Location
                | CoordinateSource::AdminRegion
                | CoordinateSource::CapitalFallback
        )
    }
}

impl fmt::Display for CoordinateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSource::Direct => write!(f, "direct"),
            CoordinateSource::Location => write!(f, "location"),
            CoordinateSource::AdminRegion => write!(f, "admin_region"),
            CoordinateSource::CapitalFallback => write!(f, "capital_fallback"),
            CoordinateSource::None => write!(f, "none"),
        }
    }
}

/// Resolver output: a coordinate and the hop that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateResult {
    pub coordinate: Option<Coordinate>,
    pub source: CoordinateSource,
}

impl CoordinateResult {
    pub fn found(coordinate: Coordinate, source: CoordinateSource) -> Self {
        Self {
            coordinate: Some(coordinate),
            source,
        }
    }

    pub fn unresolved() -> Self {
        Self {
            coordinate: None,
            source: CoordinateSource::None,
        }
    }
}
