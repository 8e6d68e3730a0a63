use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::EntityId;
use crate::error::TimelineError;

fn entity_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.)?wikidata\.org/(?:entity|wiki)/([QPL][0-9]+)$")
            .expect("valid entity uri pattern")
    })
}

/// Parses the id list handed over by the query step.
///
/// Accepts plain text (one id or entity URI per line, `#` comments) or a
/// SPARQL JSON result. For the latter `variable` picks the binding to read;
/// without it the first variable in `head.vars` holding an entity URI is
/// used. Duplicates are dropped, first occurrence wins.
pub fn parse_id_list(content: &str, variable: Option<&str>) -> Result<Vec<EntityId>, TimelineError> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    let ids = if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|err| TimelineError::InvalidInput(err.to_string()))?;
        parse_sparql_bindings(&value, variable)?
    } else {
        parse_lines(trimmed)?
    };
    Ok(dedup(ids))
}

fn parse_lines(content: &str) -> Result<Vec<EntityId>, TimelineError> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.parse::<EntityId>()
                .map_err(|_| TimelineError::InvalidInput(format!("not an entity id: {line}")))
        })
        .collect()
}

fn parse_sparql_bindings(value: &Value, variable: Option<&str>) -> Result<Vec<EntityId>, TimelineError> {
    let bindings = value
        .get("results")
        .and_then(|results| results.get("bindings"))
        .and_then(Value::as_array)
        .ok_or_else(|| TimelineError::InvalidInput("missing results.bindings".to_string()))?;

    let vars: Vec<&str> = match variable {
        Some(name) => vec![name],
        None => value
            .get("head")
            .and_then(|head| head.get("vars"))
            .and_then(Value::as_array)
            .map(|vars| vars.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default(),
    };

    let mut ids = Vec::with_capacity(bindings.len());
    for row in bindings {
        let cell_value = |name: &str| {
            row.get(name)
                .and_then(|cell| cell.get("value"))
                .and_then(Value::as_str)
        };
        let uri = if vars.is_empty() {
            row.as_object().and_then(|cells| {
                cells
                    .values()
                    .filter_map(|cell| cell.get("value").and_then(Value::as_str))
                    .find(|value| entity_uri_regex().is_match(value))
            })
        } else if variable.is_some() {
            vars.first().copied().and_then(|name| cell_value(name))
        } else {
            vars.iter()
                .copied()
                .filter_map(|name| cell_value(name))
                .find(|value| entity_uri_regex().is_match(value))
        };
        match uri.and_then(|uri| uri.parse::<EntityId>().ok()) {
            Some(id) => ids.push(id),
            None => tracing::warn!(row = %row, "skipping binding without an entity id"),
        }
    }
    Ok(ids)
}

fn dedup(ids: Vec<EntityId>) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
