use std::io::Write;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use world_history_timeline::config::{Config, ConfigLoader, ConfigOverrides};
use world_history_timeline::error::TimelineError;

#[test]
fn defaults_apply_without_config() {
    let config = Config {
        cache_directory: Some("/tmp/wht".to_string()),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap();

    assert_eq!(resolved.entity_fetch_timeout, Duration::from_secs(30));
    assert_eq!(resolved.max_fallback_hops, 4);
    assert_eq!(resolved.retry_count, 2);
    assert_eq!(resolved.retry_base_delay, Duration::from_millis(250));
    assert_eq!(resolved.language, "en");
    assert_eq!(
        resolved.entity_endpoint,
        "https://www.wikidata.org/wiki/Special:EntityData"
    );
    assert!(resolved.user_agent.starts_with("world-history-timeline/"));
    assert_eq!(resolved.run_timeout, None);
}

#[test]
fn out_of_range_hops_are_rejected() {
    let config = Config {
        cache_directory: Some("/tmp/wht".to_string()),
        max_fallback_hops: Some(5),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, TimelineError::InvalidConfig(_));

    let overrides = ConfigOverrides {
        cache_directory: Some("/tmp/wht".to_string()),
        max_fallback_hops: Some(0),
        ..ConfigOverrides::default()
    };
    let err = ConfigLoader::resolve_config(Config::default(), overrides).unwrap_err();
    assert_matches!(err, TimelineError::InvalidConfig(_));
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"cache_directory": "/srv/wht-cache", "retry_count": 4, "entity_fetch_timeout_secs": 10, "run_timeout_secs": 600, "language": "fr"}}"#
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let resolved = ConfigLoader::resolve(Some(&path), ConfigOverrides::default()).unwrap();

    assert_eq!(resolved.cache_directory, Utf8PathBuf::from("/srv/wht-cache"));
    assert_eq!(resolved.retry_count, 4);
    assert_eq!(resolved.entity_fetch_timeout, Duration::from_secs(10));
    assert_eq!(resolved.run_timeout, Some(Duration::from_secs(600)));
    assert_eq!(resolved.language, "fr");
}

#[test]
fn unknown_keys_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"sparql_url": "https://query.wikidata.org/sparql"}}"#).unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let err = ConfigLoader::resolve(Some(&path), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, TimelineError::ConfigParse(_));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = ConfigLoader::resolve(Some("/nonexistent/wht.json"), ConfigOverrides::default())
        .unwrap_err();
    assert_matches!(err, TimelineError::ConfigRead(_));
}
