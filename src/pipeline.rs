use std::time::{Duration, Instant};

use serde::Serialize;

use crate::budget::RunBudget;
use crate::cache::FsEntityCache;
use crate::config::ResolvedConfig;
use crate::domain::{CoordinateSource, EntityId};
use crate::error::TimelineError;
use crate::fetcher::{CachingFetcher, EntityFetch, RetryPolicy, RetryingFetcher};
use crate::record::{NormalizedRecord, RecordBuilder};
use crate::resolver::CoordinateResolver;
use crate::sink::{RecordSink, UpsertOutcome};
use crate::wikidata::WikidataHttpClient;

pub type HttpFetcher = RetryingFetcher<CachingFetcher<WikidataHttpClient, FsEntityCache>>;

/// Production fetch stack: retry around cache-first around HTTP.
pub fn http_fetcher(config: &ResolvedConfig) -> Result<HttpFetcher, TimelineError> {
    let source = WikidataHttpClient::new(
        &config.entity_endpoint,
        &config.user_agent,
        config.entity_fetch_timeout,
    )?;
    let cache = FsEntityCache::new(config.cache_directory.clone());
    cache.ensure_root()?;
    let policy = RetryPolicy {
        retries: config.retry_count,
        base_delay: config.retry_base_delay,
    };
    Ok(RetryingFetcher::new(CachingFetcher::new(source, cache), policy))
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Written,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub status: ItemStatus,
    pub outcome: Option<UpsertOutcome>,
    pub coordinate_source: Option<CoordinateSource>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub total: usize,
    pub written: usize,
    pub inserted: usize,
    pub updated: usize,
    pub resolved_direct: usize,
    pub resolved_fallback: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub skipped: usize,
    pub items: Vec<ItemReport>,
}

impl RunSummary {
    fn new(total: usize) -> Self {
        Self {
            started_at: iso_timestamp(),
            finished_at: String::new(),
            total,
            written: 0,
            inserted: 0,
            updated: 0,
            resolved_direct: 0,
            resolved_fallback: 0,
            unresolved: 0,
            failed: 0,
            skipped: 0,
            items: Vec::with_capacity(total),
        }
    }

    fn record_written(&mut self, id: &EntityId, outcome: UpsertOutcome, source: CoordinateSource) {
        self.written += 1;
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
        match source {
            CoordinateSource::Direct => self.resolved_direct += 1,
            CoordinateSource::None => self.unresolved += 1,
            _ => self.resolved_fallback += 1,
        }
        self.items.push(ItemReport {
            id: id.to_string(),
            status: ItemStatus::Written,
            outcome: Some(outcome),
            coordinate_source: Some(source),
            error: None,
        });
    }

    fn record_failed(&mut self, id: &EntityId, err: &TimelineError) {
        self.failed += 1;
        self.items.push(ItemReport {
            id: id.to_string(),
            status: ItemStatus::Failed,
            outcome: None,
            coordinate_source: None,
            error: Some(err.to_string()),
        });
    }

    fn record_skipped(&mut self, id: &EntityId) {
        self.skipped += 1;
        self.items.push(ItemReport {
            id: id.to_string(),
            status: ItemStatus::Skipped,
            outcome: None,
            coordinate_source: None,
            error: None,
        });
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_fallback_hops: usize,
    pub language: String,
    pub run_timeout: Option<Duration>,
}

impl From<&ResolvedConfig> for PipelineOptions {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            max_fallback_hops: config.max_fallback_hops,
            language: config.language.clone(),
            run_timeout: config.run_timeout,
        }
    }
}

/// Drives fetch → resolve → build → upsert over an id list. One failing id
/// never stops the run.
pub struct Pipeline<F: EntityFetch, K: RecordSink> {
    resolver: CoordinateResolver<F>,
    builder: RecordBuilder,
    sink: K,
    run_timeout: Option<Duration>,
}

impl<F: EntityFetch, K: RecordSink> Pipeline<F, K> {
    pub fn new(fetcher: F, sink: K, options: PipelineOptions) -> Self {
        Self {
            resolver: CoordinateResolver::with_max_hops(fetcher, options.max_fallback_hops),
            builder: RecordBuilder::new(&options.language),
            sink,
            run_timeout: options.run_timeout,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn run(&self, ids: &[EntityId], progress: &dyn ProgressSink) -> RunSummary {
        self.run_within(ids, &RunBudget::from_timeout(self.run_timeout), progress)
    }

    pub fn run_within(
        &self,
        ids: &[EntityId],
        budget: &RunBudget,
        progress: &dyn ProgressSink,
    ) -> RunSummary {
        let total = ids.len();
        let mut summary = RunSummary::new(total);
        let start = Instant::now();

        for (index, id) in ids.iter().enumerate() {
            if budget.is_exhausted() {
                summary.record_skipped(id);
                continue;
            }
            progress.event(ProgressEvent {
                message: format!("phase=Resolve; item {}/{} {id}", index + 1, total),
                elapsed: None,
            });

            match self.process(id, budget) {
                Ok((outcome, source)) => {
                    tracing::info!(%id, ?outcome, %source, "record written");
                    summary.record_written(id, outcome, source);
                }
                Err(TimelineError::Cancelled) => {
                    tracing::warn!(%id, "run budget exhausted, skipping remaining items");
                    summary.record_skipped(id);
                }
                Err(err) => {
                    tracing::warn!(%id, %err, "item failed");
                    summary.record_failed(id, &err);
                }
            }
        }

        summary.finished_at = iso_timestamp();
        progress.event(ProgressEvent {
            message: format!(
                "phase=Done; written={} failed={} skipped={}",
                summary.written, summary.failed, summary.skipped
            ),
            elapsed: Some(start.elapsed()),
        });
        summary
    }

    /// Fetch, resolve and build one record without handing it to the sink.
    pub fn resolve_one(&self, id: &EntityId) -> Result<NormalizedRecord, TimelineError> {
        self.build_record(id, &RunBudget::unbounded())
    }

    fn build_record(&self, id: &EntityId, budget: &RunBudget) -> Result<NormalizedRecord, TimelineError> {
        let doc = self.resolver.fetcher().fetch(id)?;
        let coordinates = self.resolver.resolve_within(id, &doc, budget)?;
        Ok(self.builder.build(id, &doc, coordinates))
    }

    fn process(
        &self,
        id: &EntityId,
        budget: &RunBudget,
    ) -> Result<(UpsertOutcome, CoordinateSource), TimelineError> {
        let record = self.build_record(id, budget)?;
        let source = record.coordinate_source;
        let outcome = self.sink.upsert(record)?;
        Ok((outcome, source))
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
