//! End-to-end runs of the coordinator against a mock repository

use crate::support::*;
use case_harvester::browser::HttpBrowser;
use case_harvester::checkpoint::{CacheKey, CheckpointManager, PipelineState};
use case_harvester::config::{ExtractionConfig, SessionConfig};
use case_harvester::storage::{OutputColumn, SqliteStore};
use case_harvester::{Coordinator, HarvestError, RunPhase, RunResult, WorkKey};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn browser(config: &ExtractionConfig) -> Arc<HttpBrowser> {
    Arc::new(
        HttpBrowser::from_session(&SessionConfig::default(), None, config.navigation_timeout())
            .expect("Failed to build browser"),
    )
}

fn coordinator(
    server: &MockServer,
    store: SqliteStore,
    checkpoint_path: &Path,
    config: ExtractionConfig,
) -> Coordinator<SqliteStore> {
    Coordinator::new(
        config.clone(),
        catalog_for(server),
        browser(&config),
        store,
        CheckpointManager::new(checkpoint_path),
    )
}

#[tokio::test]
async fn test_full_harvest_over_http() {
    let server = start_repository(3).await;
    let dir = TempDir::new().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.json");

    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .insert_row("Geriatrics Medicine", "Case 1", Some("Falls"))
        .unwrap();
    store.insert_row(COURSE, "Case 2", None).unwrap();
    store.insert_row(COURSE, "Case 3", Some("Delirium")).unwrap();

    let mut coordinator = coordinator(&server, store, &checkpoint_path, test_extraction_config());
    let result = coordinator.run().await.unwrap();

    assert_eq!(coordinator.phase(), RunPhase::Done);
    // Case 3's teaching point is not on its page
    assert_eq!(
        result,
        RunResult {
            succeeded: 2,
            failed: 1,
            omitted: 1,
            skipped: 0,
        }
    );

    // Listed once during enumeration, then once per job
    assert_eq!(hits(&server, LISTING_PATH).await, 4);
    // The case link, then its full view
    assert_eq!(hits(&server, "/cases/1").await, 2);

    let store = coordinator.into_store();
    let synopses = store.read_column(OutputColumn::Synopsis).unwrap();
    assert_eq!(synopses.len(), 3);
    assert_eq!(synopses[0].row_key, "Case 1");
    assert_eq!(synopses[0].value, expected_synopsis(1));
    assert_eq!(synopses[2].value, expected_synopsis(3));

    let teaching_points = store.read_column(OutputColumn::TeachingPointText).unwrap();
    assert_eq!(teaching_points.len(), 1);
    assert_eq!(teaching_points[0].row_key, "Falls");
    assert_eq!(teaching_points[0].value, "Assess gait.\nReview medications.");

    assert!(checkpoint_path.exists());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = start_repository(2).await;
    let dir = TempDir::new().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.json");
    let db_path = dir.path().join("curriculum.db");

    {
        let mut store = SqliteStore::open(&db_path).unwrap();
        store.insert_row(COURSE, "Case 1", Some("Falls")).unwrap();
        store.insert_row(COURSE, "Case 2", None).unwrap();
    }

    let first = coordinator(
        &server,
        SqliteStore::open(&db_path).unwrap(),
        &checkpoint_path,
        test_extraction_config(),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(first.succeeded, 2);

    let requests_after_first = server.received_requests().await.unwrap_or_default().len();
    let cells_after_first = SqliteStore::open(&db_path)
        .unwrap()
        .read_column(OutputColumn::Synopsis)
        .unwrap();

    let mut second = coordinator(
        &server,
        SqliteStore::open(&db_path).unwrap(),
        &checkpoint_path,
        test_extraction_config(),
    );
    let result = second.run().await.unwrap();

    assert_eq!(
        result,
        RunResult {
            skipped: 2,
            ..RunResult::default()
        }
    );
    // No listing, no navigation, no resolution
    assert_eq!(
        server.received_requests().await.unwrap_or_default().len(),
        requests_after_first
    );

    let store = second.into_store();
    let cells = store.read_column(OutputColumn::Synopsis).unwrap();
    assert_eq!(cells.len(), cells_after_first.len());
    for (after, before) in cells.iter().zip(&cells_after_first) {
        assert_eq!(after.row_id, before.row_id);
        assert_eq!(after.value, before.value);
    }
    assert_eq!(
        store
            .read_column(OutputColumn::TeachingPointText)
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_resume_after_crash() {
    const ITEMS: u32 = 100;

    let server = start_repository(ITEMS).await;
    let dir = TempDir::new().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.json");

    // A run that snapshotted after 40 items and crashed after 47
    {
        let manager = CheckpointManager::new(&checkpoint_path);
        let state = Mutex::new(PipelineState::new());
        for id in 1..=47 {
            {
                let mut state = state.lock().unwrap();
                let case_name = format!("Case {id}");
                state
                    .cache
                    .put(CacheKey::synopsis(&case_name), expected_synopsis(id));
                state.mark_processed(WorkKey::new(case_name, None));
            }
            if id == 40 {
                manager.snapshot(&state).await.unwrap();
            }
        }
    }

    let restored = CheckpointManager::new(&checkpoint_path)
        .restore()
        .await
        .unwrap();
    assert_eq!(restored.processed.len(), 40);
    assert_eq!(restored.cache.len(), 40);

    let mut store = SqliteStore::open_in_memory().unwrap();
    for id in 1..=ITEMS {
        store
            .insert_row(COURSE, &format!("Case {id}"), None)
            .unwrap();
    }

    let config = ExtractionConfig {
        max_concurrent_jobs: 8,
        checkpoint_interval: 10,
        ..test_extraction_config()
    };
    let mut coordinator = coordinator(&server, store, &checkpoint_path, config);
    let result = coordinator.run().await.unwrap();

    assert_eq!(result.skipped, 40);
    assert_eq!(result.succeeded, 60);
    assert_eq!(result.failed, 0);
    assert_eq!(result.omitted, 0);

    // Items from before the snapshot were never fetched again
    assert_eq!(hits(&server, "/cases/40").await, 0);
    assert_eq!(hits(&server, "/cases/41").await, 2);
    assert_eq!(hits(&server, "/cases/100").await, 2);

    let state = coordinator.state();
    {
        let state = state.lock().unwrap();
        assert_eq!(state.processed.len(), ITEMS as usize);
        assert_eq!(state.cache.len(), ITEMS as usize);
    }

    let final_checkpoint = CheckpointManager::new(&checkpoint_path)
        .restore()
        .await
        .unwrap();
    assert_eq!(final_checkpoint.processed.len(), ITEMS as usize);

    let synopses = coordinator
        .into_store()
        .read_column(OutputColumn::Synopsis)
        .unwrap();
    assert_eq!(synopses.len(), ITEMS as usize);
    assert_eq!(synopses[99].value, expected_synopsis(100));
}

#[tokio::test]
async fn test_unreachable_repository_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(1))
                .set_delay(Duration::from_millis(2000)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.insert_row(COURSE, "Case 1", None).unwrap();

    let config = ExtractionConfig {
        navigation_timeout_ms: 200,
        ..test_extraction_config()
    };
    let mut coordinator = coordinator(
        &server,
        store,
        &dir.path().join("checkpoint.json"),
        config,
    );

    let result = coordinator.run().await;
    assert!(matches!(result, Err(HarvestError::Enumeration { .. })));
    assert_eq!(coordinator.phase(), RunPhase::Failed);
}

#[tokio::test]
async fn test_job_navigation_timeout_fails_only_the_job() {
    let server = MockServer::start().await;
    // Enumeration sees the listing; the job's own visit stalls
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(1))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.insert_row(COURSE, "Case 1", None).unwrap();

    let config = ExtractionConfig {
        navigation_timeout_ms: 300,
        ..test_extraction_config()
    };
    let mut coordinator = coordinator(
        &server,
        store,
        &dir.path().join("checkpoint.json"),
        config,
    );

    let result = coordinator.run().await.unwrap();
    assert_eq!(coordinator.phase(), RunPhase::Done);
    assert_eq!(
        result,
        RunResult {
            succeeded: 0,
            failed: 1,
            omitted: 1,
            skipped: 0,
        }
    );
    assert_eq!(hits(&server, "/cases/1").await, 0);

    // The failed item still counts as processed
    let state = coordinator.state();
    assert_eq!(state.lock().unwrap().processed.len(), 1);
}

#[tokio::test]
async fn test_missing_listing_page_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.insert_row(COURSE, "Case 1", None).unwrap();

    let mut coordinator = coordinator(
        &server,
        store,
        &dir.path().join("checkpoint.json"),
        test_extraction_config(),
    );

    match coordinator.run().await {
        Err(HarvestError::Enumeration { course, .. }) => assert_eq!(course, COURSE),
        other => panic!("expected an enumeration failure, got {:?}", other),
    }
}
