#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use world_history_timeline::domain::EntityId;
use world_history_timeline::entity::EntityDocument;
use world_history_timeline::error::TimelineError;
use world_history_timeline::wikidata::EntitySource;

pub fn id(value: &str) -> EntityId {
    value.parse().unwrap()
}

pub fn coordinate_claim(latitude: f64, longitude: f64) -> Value {
    json!({
        "mainsnak": {
            "snaktype": "value",
            "datavalue": {
                "type": "globecoordinate",
                "value": {
                    "latitude": latitude,
                    "longitude": longitude,
                    "globe": "http://www.wikidata.org/entity/Q2"
                }
            }
        }
    })
}

pub fn reference_claim(target: &str) -> Value {
    json!({
        "mainsnak": {
            "snaktype": "value",
            "datavalue": {"type": "wikibase-entityid", "value": {"entity-type": "item", "id": target}}
        }
    })
}

pub fn time_claim(time: &str) -> Value {
    json!({
        "mainsnak": {
            "snaktype": "value",
            "datavalue": {"type": "time", "value": {"time": time, "precision": 11}}
        }
    })
}

/// Builds an entity object; `claims` pairs a property code with its statements.
pub fn entity(id: &str, label: &str, claims: &[(&str, Vec<Value>)]) -> Value {
    let claims: serde_json::Map<String, Value> = claims
        .iter()
        .map(|(property, values)| (property.to_string(), Value::Array(values.clone())))
        .collect();
    json!({
        "type": "item",
        "id": id,
        "labels": {"en": {"language": "en", "value": label}},
        "descriptions": {"en": {"language": "en", "value": format!("{label} (test)")}},
        "claims": claims
    })
}

pub fn document(raw: Value) -> EntityDocument {
    EntityDocument::from_value(raw, None).unwrap()
}

/// In-memory upstream that counts requests per id.
#[derive(Default)]
pub struct MockSource {
    entities: HashMap<EntityId, Value>,
    transient: Vec<EntityId>,
    calls: Mutex<HashMap<EntityId, usize>>,
}

impl MockSource {
    pub fn new(entities: Vec<Value>) -> Self {
        let entities = entities
            .into_iter()
            .map(|raw| {
                let key = id(raw["id"].as_str().unwrap());
                (key, raw)
            })
            .collect();
        Self {
            entities,
            ..Self::default()
        }
    }

    pub fn failing_transiently(mut self, target: &str) -> Self {
        self.transient.push(id(target));
        self
    }

    pub fn calls_for(&self, target: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&id(target))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl EntitySource for MockSource {
    fn fetch_entity(&self, target: &EntityId) -> Result<EntityDocument, TimelineError> {
        *self.calls.lock().unwrap().entry(target.clone()).or_insert(0) += 1;
        if self.transient.contains(target) {
            return Err(TimelineError::Transient("connection reset".to_string()));
        }
        match self.entities.get(target) {
            Some(raw) => EntityDocument::from_value(raw.clone(), Some(target)),
            None => Err(TimelineError::NotFound(target.clone())),
        }
    }
}
