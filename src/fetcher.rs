use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::EntityCache;
use crate::domain::EntityId;
use crate::entity::EntityDocument;
use crate::error::TimelineError;
use crate::wikidata::EntitySource;

/// "Fetch by id" as seen by the resolver and the driver.
pub trait EntityFetch: Send + Sync {
    fn fetch(&self, id: &EntityId) -> Result<EntityDocument, TimelineError>;
}

impl<T: EntityFetch + ?Sized> EntityFetch for &T {
    fn fetch(&self, id: &EntityId) -> Result<EntityDocument, TimelineError> {
        (**self).fetch(id)
    }
}

impl<T: EntityFetch + ?Sized> EntityFetch for Arc<T> {
    fn fetch(&self, id: &EntityId) -> Result<EntityDocument, TimelineError> {
        (**self).fetch(id)
    }
}

/// Cache-first fetcher: a hit never touches the source, a miss issues exactly
/// one upstream request and stores the result.
#[derive(Debug, Clone)]
pub struct CachingFetcher<S: EntitySource, C: EntityCache> {
    source: S,
    cache: C,
}

impl<S: EntitySource, C: EntityCache> CachingFetcher<S, C> {
    pub fn new(source: S, cache: C) -> Self {
        Self { source, cache }
    }
}

impl<S: EntitySource, C: EntityCache> EntityFetch for CachingFetcher<S, C> {
    fn fetch(&self, id: &EntityId) -> Result<EntityDocument, TimelineError> {
        if let Some(doc) = self.cache.get(id) {
            tracing::debug!(%id, "entity cache hit");
            return Ok(doc);
        }
        tracing::debug!(%id, "entity cache miss");
        let doc = self.source.fetch_entity(id)?;
        if let Err(err) = self.cache.put(id, &doc) {
            tracing::warn!(%id, %err, "continuing with uncached entity");
        }
        Ok(doc)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            base_delay: Duration::ZERO,
        }
    }
}

/// Caller-side retry around a single-shot fetcher. Only transient failures
/// are retried, with a linear backoff of `base_delay * attempt`.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<F: EntityFetch> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: EntityFetch> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<F: EntityFetch> EntityFetch for RetryingFetcher<F> {
    fn fetch(&self, id: &EntityId) -> Result<EntityDocument, TimelineError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.fetch(id) {
                Err(err) if err.is_transient() && attempt < self.policy.retries => {
                    attempt += 1;
                    tracing::debug!(%id, %err, attempt, "retrying entity fetch");
                    thread::sleep(self.policy.base_delay * attempt);
                }
                result => return result,
            }
        }
    }
}
