mod support;

use camino::Utf8PathBuf;

use world_history_timeline::budget::RunBudget;
use world_history_timeline::cache::MemoryEntityCache;
use world_history_timeline::domain::CoordinateSource;
use world_history_timeline::fetcher::{CachingFetcher, RetryPolicy, RetryingFetcher};
use world_history_timeline::pipeline::{ItemStatus, NoopProgress, Pipeline, PipelineOptions};
use world_history_timeline::record::NormalizedRecord;
use world_history_timeline::sink::{JsonDirSink, MemorySink, UpsertOutcome};

use support::{MockSource, coordinate_claim, entity, id, reference_claim, time_claim};

fn options() -> PipelineOptions {
    PipelineOptions {
        max_fallback_hops: 4,
        language: "en".to_string(),
        run_timeout: None,
    }
}

fn battles() -> MockSource {
    MockSource::new(vec![
        entity(
            "Q1",
            "Battle of Brussels",
            &[
                ("P625", vec![coordinate_claim(50.85, 4.35)]),
                ("P580", vec![time_claim("+1830-09-23T00:00:00Z")]),
                ("P582", vec![time_claim("+1830-09-27T00:00:00Z")]),
            ],
        ),
        entity("Q2", "Siege of Vienna", &[("P131", vec![reference_claim("Q3")])]),
        entity("Q3", "Vienna", &[("P625", vec![coordinate_claim(48.2, 16.3)])]),
        entity("Q4", "Unplaced skirmish", &[]),
    ])
}

#[test]
fn end_to_end_direct_and_admin_region() {
    let source = battles();
    let cache = MemoryEntityCache::new();
    let pipeline = Pipeline::new(CachingFetcher::new(&source, &cache), MemorySink::new(), options());

    let summary = pipeline.run(&[id("Q1"), id("Q2")], &NoopProgress);
    assert_eq!(summary.written, 2);

    let q1 = pipeline.sink().get(&id("Q1")).unwrap();
    assert_eq!(q1.latitude, Some(50.85));
    assert_eq!(q1.longitude, Some(4.35));
    assert_eq!(q1.coordinate_source, CoordinateSource::Direct);
    assert_eq!(q1.label.as_deref(), Some("Battle of Brussels"));
    assert_eq!(q1.start_time.as_deref(), Some("+1830-09-23T00:00:00Z"));
    assert_eq!(q1.end_time.as_deref(), Some("+1830-09-27T00:00:00Z"));
    assert_eq!(q1.start_year, Some(1830));

    let q2 = pipeline.sink().get(&id("Q2")).unwrap();
    assert_eq!(q2.latitude, Some(48.2));
    assert_eq!(q2.longitude, Some(16.3));
    assert_eq!(q2.coordinate_source, CoordinateSource::AdminRegion);
    assert_eq!(q2.raw_entity.id, id("Q2"));
    assert_eq!(q2.start_time, None);
}

#[test]
fn failures_are_isolated_and_counted() {
    let source = battles();
    let cache = MemoryEntityCache::new();
    let pipeline = Pipeline::new(CachingFetcher::new(&source, &cache), MemorySink::new(), options());

    let ids = [id("Q1"), id("Q404"), id("Q2"), id("Q4")];
    let summary = pipeline.run(&ids, &NoopProgress);

    assert_eq!(summary.total, 4);
    assert_eq!(summary.written, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.resolved_direct, 1);
    assert_eq!(summary.resolved_fallback, 1);
    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.skipped, 0);

    let statuses: Vec<_> = summary.items.iter().map(|item| (item.id.as_str(), item.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("Q1", ItemStatus::Written),
            ("Q404", ItemStatus::Failed),
            ("Q2", ItemStatus::Written),
            ("Q4", ItemStatus::Written),
        ]
    );
    assert!(summary.items[1].error.as_deref().unwrap().contains("Q404"));

    let q4 = pipeline.sink().get(&id("Q4")).unwrap();
    assert_eq!(q4.coordinate_source, CoordinateSource::None);
    assert!(q4.latitude.is_none() && q4.longitude.is_none());
}

#[test]
fn shared_references_are_fetched_once_per_run() {
    let source = MockSource::new(vec![
        entity("Q10", "First battle", &[("P276", vec![reference_claim("Q90")])]),
        entity("Q11", "Second battle", &[("P276", vec![reference_claim("Q90")])]),
        entity("Q90", "Paris", &[("P625", vec![coordinate_claim(48.8566, 2.3522)])]),
    ]);
    let cache = MemoryEntityCache::new();
    let pipeline = Pipeline::new(CachingFetcher::new(&source, &cache), MemorySink::new(), options());

    let summary = pipeline.run(&[id("Q10"), id("Q11")], &NoopProgress);

    assert_eq!(summary.resolved_fallback, 2);
    assert_eq!(source.calls_for("Q90"), 1);
}

#[test]
fn rerun_updates_instead_of_inserting() {
    let source = battles();
    let cache = MemoryEntityCache::new();
    let pipeline = Pipeline::new(CachingFetcher::new(&source, &cache), MemorySink::new(), options());

    let first = pipeline.run(&[id("Q1")], &NoopProgress);
    let second = pipeline.run(&[id("Q1")], &NoopProgress);

    assert_eq!(first.inserted, 1);
    assert_eq!(second.updated, 1);
    assert_eq!(second.items[0].outcome, Some(UpsertOutcome::Updated));
    assert_eq!(pipeline.sink().len(), 1);
    assert_eq!(source.calls_for("Q1"), 1);
}

#[test]
fn transient_failures_are_retried_by_the_caller() {
    let source = battles().failing_transiently("Q1");
    let cache = MemoryEntityCache::new();
    let fetcher = RetryingFetcher::new(
        CachingFetcher::new(&source, &cache),
        RetryPolicy {
            retries: 2,
            base_delay: std::time::Duration::ZERO,
        },
    );
    let pipeline = Pipeline::new(fetcher, MemorySink::new(), options());

    let summary = pipeline.run(&[id("Q1"), id("Q2")], &NoopProgress);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(source.calls_for("Q1"), 3);
}

#[test]
fn exhausted_budget_skips_remaining_items() {
    let source = battles();
    let cache = MemoryEntityCache::new();
    let pipeline = Pipeline::new(CachingFetcher::new(&source, &cache), MemorySink::new(), options());
    let budget = RunBudget::unbounded();
    budget.cancel();

    let summary = pipeline.run_within(&[id("Q1"), id("Q2")], &budget, &NoopProgress);

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.written, 0);
    assert_eq!(source.total_calls(), 0);
}

#[test]
fn resolve_one_does_not_write() {
    let source = battles();
    let cache = MemoryEntityCache::new();
    let pipeline = Pipeline::new(CachingFetcher::new(&source, &cache), MemorySink::new(), options());

    let record = pipeline.resolve_one(&id("Q2")).unwrap();

    assert_eq!(record.coordinate_source, CoordinateSource::AdminRegion);
    assert!(pipeline.sink().is_empty());
}

#[test]
fn json_dir_sink_round_trips_records() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("records")).unwrap();
    let source = battles();
    let cache = MemoryEntityCache::new();
    let pipeline = Pipeline::new(
        CachingFetcher::new(&source, &cache),
        JsonDirSink::new(root.clone()),
        options(),
    );

    let first = pipeline.run(&[id("Q2")], &NoopProgress);
    let second = pipeline.run(&[id("Q2")], &NoopProgress);
    assert_eq!(first.inserted, 1);
    assert_eq!(second.updated, 1);

    let content = std::fs::read_to_string(root.join("Q2.json").as_std_path()).unwrap();
    let record: NormalizedRecord = serde_json::from_str(&content).unwrap();
    assert_eq!(record.coordinate_source, CoordinateSource::AdminRegion);
    assert_eq!(record.latitude, Some(48.2));
    assert_eq!(record.raw_entity.labels.get("en").map(String::as_str), Some("Siege of Vienna"));
}
