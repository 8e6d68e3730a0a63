use serde::{Deserialize, Serialize};

use crate::claims::{description, extract_time, label, year_of};
use crate::domain::{Coordinate, CoordinateResult, CoordinateSource, EntityId, property};
use crate::entity::EntityDocument;

pub const DEFAULT_LANGUAGE: &str = "en";

/// One event, ready for the upsert sink. Latitude and longitude are either
/// both present, with a source other than `None`, or both absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: EntityId,
    pub label: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub coordinate_source: CoordinateSource,
    pub raw_entity: EntityDocument,
}

impl NormalizedRecord {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordBuilder {
    language: String,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl RecordBuilder {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }

    pub fn build(
        &self,
        id: &EntityId,
        doc: &EntityDocument,
        coordinates: CoordinateResult,
    ) -> NormalizedRecord {
        let start_time = extract_time(doc, property::START_TIME)
            .or_else(|| extract_time(doc, property::POINT_IN_TIME));
        let end_time = extract_time(doc, property::END_TIME)
            .or_else(|| extract_time(doc, property::POINT_IN_TIME));

        let (coordinate, coordinate_source) = match (coordinates.coordinate, coordinates.source) {
            (Some(_), CoordinateSource::None) | (None, _) => (None, CoordinateSource::None),
            (Some(coordinate), source) => (Some(coordinate), source),
        };

        NormalizedRecord {
            id: id.clone(),
            label: label(doc, &self.language),
            description: description(doc, &self.language),
            start_year: start_time.as_deref().and_then(year_of),
            end_year: end_time.as_deref().and_then(year_of),
            start_time,
            end_time,
            latitude: coordinate.map(|c| c.latitude),
            longitude: coordinate.map(|c| c.longitude),
            coordinate_source,
            raw_entity: doc.clone(),
        }
    }
}

pub fn build_record(
    id: &EntityId,
    doc: &EntityDocument,
    coordinates: CoordinateResult,
) -> NormalizedRecord {
    RecordBuilder::default().build(id, doc, coordinates)
}
