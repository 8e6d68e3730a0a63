use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Coordinate, EntityId};
use crate::error::TimelineError;

const EARTH_GLOBE_SUFFIX: &str = "/Q2";

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    Time(String),
    Coordinate(Coordinate),
    EntityRef(EntityId),
    Other,
}

/// The claim graph of one entity.
///
/// The untouched wire object is kept in `raw` and is what gets serialized,
/// so a cached or audited document round-trips to exactly what upstream sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct EntityDocument {
    pub id: EntityId,
    pub labels: BTreeMap<String, String>,
    pub descriptions: BTreeMap<String, String>,
    pub claims: BTreeMap<String, Vec<ClaimValue>>,
    raw: Value,
}

impl EntityDocument {
    /// Parses one entity object. `fallback_id` is used when the object has no
    /// usable `id` of its own.
    pub fn from_value(raw: Value, fallback_id: Option<&EntityId>) -> Result<Self, TimelineError> {
        let id = match raw.get("id").and_then(Value::as_str) {
            Some(value) => value.parse()?,
            None => fallback_id.cloned().ok_or_else(|| {
                TimelineError::InvalidEntityId("entity document carries no id".to_string())
            })?,
        };
        if raw.get("missing").is_some() {
            return Err(TimelineError::NotFound(id));
        }

        let labels = language_map(raw.get("labels"));
        let descriptions = language_map(raw.get("descriptions"));
        let claims = raw
            .get("claims")
            .and_then(Value::as_object)
            .map(|claims| {
                claims
                    .iter()
                    .map(|(property, statements)| {
                        let values = statements
                            .as_array()
                            .map(|items| {
                                items
                                    .iter()
                                    .map(|statement| parse_statement_lenient(property, statement))
                                    .collect()
                            })
                            .unwrap_or_default();
                        (property.clone(), values)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            labels,
            descriptions,
            claims,
            raw,
        })
    }

    /// Parses an entity-data response of the form `{"entities": {"<id>": {...}}}`.
    /// A redirected id is answered with the target entity, which is accepted
    /// when it is the only one in the map.
    pub fn from_response(requested: &EntityId, body: Value) -> Result<Self, TimelineError> {
        let Some(entities) = body.get("entities").and_then(Value::as_object) else {
            return Self::from_value(body, Some(requested));
        };
        let entity = match entities.get(requested.as_str()) {
            Some(entity) => entity.clone(),
            None if entities.len() == 1 => entities
                .values()
                .next()
                .cloned()
                .ok_or_else(|| TimelineError::NotFound(requested.clone()))?,
            None => return Err(TimelineError::NotFound(requested.clone())),
        };
        Self::from_value(entity, Some(requested))
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn claim_values(&self, property: &str) -> &[ClaimValue] {
        self.claims
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl TryFrom<Value> for EntityDocument {
    type Error = TimelineError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value, None)
    }
}

impl From<EntityDocument> for Value {
    fn from(value: EntityDocument) -> Self {
        value.raw
    }
}

fn language_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(lang, entry)| {
                    entry
                        .get("value")
                        .and_then(Value::as_str)
                        .map(|text| (lang.clone(), text.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_statement_lenient(property: &str, statement: &Value) -> ClaimValue {
    match parse_statement(property, statement) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(%err, "ignoring claim");
            ClaimValue::Other
        }
    }
}

/// Decodes `{mainsnak: {datavalue: {type, value}}}`. Snaks without a data
/// value (`novalue`/`somevalue`) and unknown types decode to `Other`.
pub fn parse_statement(property: &str, statement: &Value) -> Result<ClaimValue, TimelineError> {
    let Some(datavalue) = statement
        .get("mainsnak")
        .and_then(|snak| snak.get("datavalue"))
    else {
        return Ok(ClaimValue::Other);
    };
    let kind = datavalue.get("type").and_then(Value::as_str).unwrap_or("");
    let value = datavalue.get("value").unwrap_or(&Value::Null);
    let malformed = |reason: &str| TimelineError::MalformedClaim {
        property: property.to_string(),
        reason: reason.to_string(),
    };

    match kind {
        "time" => value
            .get("time")
            .and_then(Value::as_str)
            .map(|time| ClaimValue::Time(time.to_string()))
            .ok_or_else(|| malformed("time value without a time string")),
        "globecoordinate" => {
            let globe = value.get("globe").and_then(Value::as_str);
            if globe.is_some_and(|globe| !globe.ends_with(EARTH_GLOBE_SUFFIX)) {
                return Err(malformed("coordinate is not on Earth"));
            }
            let latitude = value.get("latitude").and_then(Value::as_f64);
            let longitude = value.get("longitude").and_then(Value::as_f64);
            match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => {
                    let coordinate = Coordinate::new(latitude, longitude);
                    if !coordinate.is_valid() {
                        return Err(malformed("coordinate out of range"));
                    }
                    Ok(ClaimValue::Coordinate(coordinate))
                }
                _ => Err(malformed("coordinate without numeric latitude/longitude")),
            }
        }
        "wikibase-entityid" => entity_ref(value)
            .map(ClaimValue::EntityRef)
            .ok_or_else(|| malformed("entity reference without a usable id")),
        _ => Ok(ClaimValue::Other),
    }
}

fn entity_ref(value: &Value) -> Option<EntityId> {
    if let Some(id) = value.get("id").and_then(Value::as_str) {
        return id.parse().ok();
    }
    let numeric = value.get("numeric-id").and_then(Value::as_u64)?;
    let prefix = match value.get("entity-type").and_then(Value::as_str) {
        Some("property") => "P",
        Some("lexeme") => "L",
        _ => "Q",
    };
    format!("{prefix}{numeric}").parse().ok()
}
