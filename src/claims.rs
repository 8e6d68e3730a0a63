//! Typed lookups over an entity's claim set.
//!
//! Every extractor looks at the first value listed for the property only. A
//! value of the wrong kind yields `None`; there is no error path.

use crate::domain::{Coordinate, EntityId};
use crate::entity::{ClaimValue, EntityDocument};

pub fn extract_time(doc: &EntityDocument, property: &str) -> Option<String> {
    match doc.claim_values(property).first()? {
        ClaimValue::Time(time) => Some(time.clone()),
        _ => None,
    }
}

pub fn extract_coordinate(doc: &EntityDocument, property: &str) -> Option<Coordinate> {
    match doc.claim_values(property).first()? {
        ClaimValue::Coordinate(coordinate) => Some(*coordinate),
        _ => None,
    }
}

pub fn extract_reference(doc: &EntityDocument, property: &str) -> Option<EntityId> {
    match doc.claim_values(property).first()? {
        ClaimValue::EntityRef(id) => Some(id.clone()),
        _ => None,
    }
}

pub fn label(doc: &EntityDocument, language: &str) -> Option<String> {
    doc.labels.get(language).cloned()
}

pub fn description(doc: &EntityDocument, language: &str) -> Option<String> {
    doc.descriptions.get(language).cloned()
}

/// Leading signed year of a time string such as `+1815-06-18T00:00:00Z`.
pub fn year_of(time: &str) -> Option<i64> {
    let trimmed = time.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.trim_start_matches('+')),
    };
    let year = digits.split('-').next()?;
    if year.is_empty() || !year.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    year.parse::<i64>().ok().map(|year| sign * year)
}
