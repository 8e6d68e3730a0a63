//! Coordinate fallback chain.
//!
//! The chain is data, not control flow: [`FALLBACK_CHAIN`] lists the steps in
//! precedence order, and each step names the reference properties to follow
//! from the event before reading `P625` on the entity it lands on. The first
//! step that produces a coordinate wins and tags the result with its source.

use std::collections::HashSet;

use crate::budget::RunBudget;
use crate::claims::{extract_coordinate, extract_reference};
use crate::domain::{CoordinateResult, CoordinateSource, EntityId, property};
use crate::entity::EntityDocument;
use crate::error::TimelineError;
use crate::fetcher::EntityFetch;

pub const DEFAULT_MAX_HOPS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopKind {
    /// Read the coordinate on the event itself.
    Direct,
    /// Follow one reference, then read its coordinate.
    Reference,
    /// Follow a reference, then a second reference from that entity.
    Chained,
}

#[derive(Debug, Clone, Copy)]
pub struct FallbackStep {
    pub source: CoordinateSource,
    pub kind: HopKind,
    pub path: &'static [&'static str],
}

pub const FALLBACK_CHAIN: [FallbackStep; 4] = [
    FallbackStep {
        source: CoordinateSource::Direct,
        kind: HopKind::Direct,
        path: &[],
    },
    FallbackStep {
        source: CoordinateSource::Location,
        kind: HopKind::Reference,
        path: &[property::LOCATION],
    },
    FallbackStep {
        source: CoordinateSource::AdminRegion,
        kind: HopKind::Reference,
        path: &[property::ADMIN_REGION],
    },
    FallbackStep {
        source: CoordinateSource::CapitalFallback,
        kind: HopKind::Chained,
        path: &[property::COUNTRY, property::CAPITAL],
    },
];

#[derive(Debug, Clone)]
pub struct CoordinateResolver<F: EntityFetch> {
    fetcher: F,
    max_hops: usize,
}

impl<F: EntityFetch> CoordinateResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_max_hops(fetcher, DEFAULT_MAX_HOPS)
    }

    /// `max_hops` counts chain steps, `Direct` included, and is clamped to
    /// the length of the chain.
    pub fn with_max_hops(fetcher: F, max_hops: usize) -> Self {
        Self {
            fetcher,
            max_hops: max_hops.min(FALLBACK_CHAIN.len()),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn resolve(&self, doc: &EntityDocument) -> CoordinateResult {
        self.resolve_within(&doc.id, doc, &RunBudget::unbounded())
            .unwrap_or_else(|_| CoordinateResult::unresolved())
    }

    /// Like [`resolve`](Self::resolve), but gives up with `Cancelled` when the
    /// budget runs out between two hops. `requested` is the id the document
    /// was fetched under, which differs from `doc.id` after a redirect.
    pub fn resolve_within(
        &self,
        requested: &EntityId,
        doc: &EntityDocument,
        budget: &RunBudget,
    ) -> Result<CoordinateResult, TimelineError> {
        let origin = HashSet::from([requested.clone(), doc.id.clone()]);

        for step in FALLBACK_CHAIN.iter().take(self.max_hops) {
            let found = match step.kind {
                HopKind::Direct => extract_coordinate(doc, property::COORDINATE_LOCATION),
                HopKind::Reference | HopKind::Chained => {
                    match self.follow(doc, step, origin.clone(), budget)? {
                        Some(target) => extract_coordinate(&target, property::COORDINATE_LOCATION),
                        None => None,
                    }
                }
            };
            if let Some(coordinate) = found {
                tracing::debug!(id = %doc.id, source = %step.source, "coordinate resolved");
                return Ok(CoordinateResult::found(coordinate, step.source));
            }
        }

        tracing::debug!(id = %doc.id, "coordinate chain exhausted");
        Ok(CoordinateResult::unresolved())
    }

    /// Walks `step.path` from `origin`. Returns `None` if a reference is
    /// missing, points back into the path walked so far, or cannot be fetched.
    /// `visited` only spans this step; the same entity may be reached again
    /// through another step.
    fn follow(
        &self,
        origin: &EntityDocument,
        step: &FallbackStep,
        mut visited: HashSet<EntityId>,
        budget: &RunBudget,
    ) -> Result<Option<EntityDocument>, TimelineError> {
        let mut current: Option<EntityDocument> = None;
        for code in step.path {
            let holder = current.as_ref().unwrap_or(origin);
            let Some(next) = extract_reference(holder, code) else {
                return Ok(None);
            };
            if !visited.insert(next.clone()) {
                tracing::debug!(from = %holder.id, to = %next, property = *code, "reference cycle, skipping step");
                return Ok(None);
            }
            budget.check()?;
            match self.fetcher.fetch(&next) {
                Ok(doc) => current = Some(doc),
                Err(err) => {
                    tracing::warn!(from = %holder.id, to = %next, source = %step.source, %err, "fallback hop failed");
                    return Ok(None);
                }
            }
        }
        Ok(current)
    }
}
