use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value as JsonValue, json};

use paycast_core::DataOrigin;
use paycast_loader::{LoadError, LoadOptions, WeightLoader, source_fn};
use paycast_predictor::{DataStatus, LiveDataSource, Predictor, PredictorConfig, PredictorError};

fn live_payload() -> JsonValue {
    json!({
        "baseSalaries": { "US": 100000.0, "UK": 70000.0 },
        "skills": { "rust": 1.5, "zig": 1.4 },
        "experience": { "perYear": 0.05, "maxYears": 15.0, "seniorBonus": 0.2 },
        "combos": [ { "skills": ["rust", "zig"], "bonus": 0.1 } ],
        "currencies": { "US": "USD", "UK": "GBP" }
    })
}

fn working_source() -> LiveDataSource {
    let source = source_fn("live-fixture", || async { Ok(live_payload()) });
    LiveDataSource::new(WeightLoader::new(), Arc::new(source), LoadOptions::default())
}

fn failing_source(loader: WeightLoader, options: LoadOptions) -> LiveDataSource {
    let source = source_fn("dead-fixture", || async {
        Err(LoadError::failed("connection refused"))
    });
    LiveDataSource::new(loader, Arc::new(source), options)
}

#[tokio::test]
async fn sync_predict_refuses_while_live_data_is_pending() {
    let predictor =
        Predictor::with_live_source(PredictorConfig::default(), working_source()).unwrap();

    assert_eq!(predictor.data_info().status, DataStatus::StaticPendingLive);
    assert_eq!(predictor.predict(&["Rust"]).unwrap_err(), PredictorError::DataNotReady);
    assert!(predictor.batch_predict(&[vec!["Rust"]]).is_err());
}

#[tokio::test]
async fn async_predict_resolves_live_weights_first() {
    let mut predictor =
        Predictor::with_live_source(PredictorConfig::new("US", 0.0), working_source()).unwrap();

    let result = predictor.predict_async(&["Rust", "Zig"]).await.unwrap();

    assert_eq!(result.breakdown.base_salary, 100_000.0);
    assert_eq!(result.skills.matched, vec!["rust", "zig"]);
    assert_eq!(result.active_combos, vec!["rust+zig"]);
    assert_eq!(result.data_source.source, DataOrigin::Live);

    let info = predictor.data_info();
    assert_eq!(info.status, DataStatus::Live);
    assert!(info.fetched_at.is_some());
    assert!(info.error.is_none());

    // Resolved: the synchronous path is open now.
    assert!(predictor.predict(&["Rust"]).is_ok());
    assert_eq!(predictor.supported_skills(), vec!["rust", "zig"]);
}

#[tokio::test]
async fn failing_source_falls_back_to_static_tables() {
    let live = failing_source(WeightLoader::new(), LoadOptions::default());
    let mut predictor = Predictor::with_live_source(PredictorConfig::new("US", 0.0), live).unwrap();

    let result = predictor.predict_async(&["React"]).await.unwrap();
    assert_eq!(result.breakdown.base_salary, 75_000.0);
    assert_eq!(result.data_source.source, DataOrigin::Static);

    let info = predictor.data_info();
    assert_eq!(info.status, DataStatus::StaticFallback);
    assert!(info.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn failing_refresh_with_cached_data_is_stale_live() {
    let loader = WeightLoader::new();
    let options = LoadOptions::default().with_cache_key("shared-weights").with_ttl_ms(-1);

    let warm = LiveDataSource::new(
        loader.clone(),
        Arc::new(source_fn("warm", || async { Ok(live_payload()) })),
        options.clone(),
    );
    let mut first = Predictor::with_live_source(PredictorConfig::default(), warm).unwrap();
    assert_eq!(first.ensure_live_data().await, DataStatus::Live);

    let mut second =
        Predictor::with_live_source(PredictorConfig::default(), failing_source(loader, options))
            .unwrap();
    let result = second.predict_async(&["Rust"]).await.unwrap();

    assert_eq!(result.breakdown.base_salary, 100_000.0);
    assert!(result.data_source.stale);
    assert_eq!(result.data_source.source, DataOrigin::StaleCache);

    let info = second.data_info();
    assert_eq!(info.status, DataStatus::StaleLive);
    assert!(info.stale);
    assert!(info.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn live_source_is_resolved_once_per_predictor() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let source = source_fn("counted", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(live_payload()) }
    });
    let live = LiveDataSource::new(
        WeightLoader::new(),
        Arc::new(source),
        LoadOptions::default().with_ttl_ms(-1),
    );

    let mut predictor = Predictor::with_live_source(PredictorConfig::default(), live).unwrap();
    let sets = vec![vec!["Rust"], vec!["Zig"], vec!["Cobol"]];
    let results = predictor.batch_predict_async(&sets).await.unwrap();
    predictor.predict_async(&["Rust"]).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[2].skills.unmatched, vec!["cobol"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
