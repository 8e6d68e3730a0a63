use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::domain::EntityId;
use crate::entity::EntityDocument;
use crate::error::TimelineError;

pub const DEFAULT_ENTITY_ENDPOINT: &str = "https://www.wikidata.org/wiki/Special:EntityData";

/// Upstream capability: fetch one entity document by id. Exactly one request
/// per call, no retries.
pub trait EntitySource: Send + Sync {
    fn fetch_entity(&self, id: &EntityId) -> Result<EntityDocument, TimelineError>;
}

impl<T: EntitySource + ?Sized> EntitySource for &T {
    fn fetch_entity(&self, id: &EntityId) -> Result<EntityDocument, TimelineError> {
        (**self).fetch_entity(id)
    }
}

impl<T: EntitySource + ?Sized> EntitySource for Arc<T> {
    fn fetch_entity(&self, id: &EntityId) -> Result<EntityDocument, TimelineError> {
        (**self).fetch_entity(id)
    }
}

#[derive(Debug, Clone)]
pub struct WikidataHttpClient {
    client: Client,
    endpoint: String,
}

impl WikidataHttpClient {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, TimelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|err| TimelineError::InvalidConfig(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| TimelineError::Transient(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn entity_url(&self, id: &EntityId) -> String {
        format!("{}/{}.json", self.endpoint, id.as_str())
    }
}

impl EntitySource for WikidataHttpClient {
    fn fetch_entity(&self, id: &EntityId) -> Result<EntityDocument, TimelineError> {
        let url = self.entity_url(id);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| TimelineError::Transient(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TimelineError::NotFound(id.clone()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "entity request failed".to_string());
            return Err(TimelineError::UpstreamStatus {
                status: status.as_u16(),
                message,
            });
        }
        let body: Value = response
            .json()
            .map_err(|err| TimelineError::Transient(err.to_string()))?;
        EntityDocument::from_response(id, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_url_layout() {
        let client =
            WikidataHttpClient::new(&format!("{DEFAULT_ENTITY_ENDPOINT}/"), "wht-test", Duration::from_secs(5))
                .unwrap();
        let id: EntityId = "Q48314".parse().unwrap();
        assert_eq!(
            client.entity_url(&id),
            "https://www.wikidata.org/wiki/Special:EntityData/Q48314.json"
        );
    }
}
