//! The HTTP browser and the scheduler against a mock repository

use crate::support::*;
use case_harvester::browser::{
    page_markup, Browser, BrowserError, HttpBrowser, LoadState, Page, Strategy, TargetDescriptor,
};
use case_harvester::config::SessionConfig;
use case_harvester::extractor::{ConcurrencyScheduler, DocumentIndex};
use case_harvester::resolver::{Action, ElementResolver, Resolved, ResolverConfig};
use case_harvester::HarvestError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn browser() -> HttpBrowser {
    HttpBrowser::from_session(&SessionConfig::default(), None, Duration::from_secs(5))
        .expect("Failed to build browser")
}

fn quick_resolver() -> ElementResolver {
    ElementResolver::new(ResolverConfig {
        attempts: 2,
        retry_delay: Duration::from_millis(5),
        visibility_timeout: Duration::from_millis(50),
        action_timeout: Duration::from_secs(5),
    })
}

#[tokio::test]
async fn test_document_index_lists_cases() {
    let server = start_repository(3).await;
    let page = browser().open_page().await.unwrap();
    let mut index = DocumentIndex::new(page, Duration::from_secs(5));

    let names = index
        .list_cases(&format!("{}{}", server.uri(), LISTING_PATH))
        .await
        .unwrap();
    index.close().await;

    assert_eq!(names, vec!["Case 1", "Case 2", "Case 3"]);
}

#[tokio::test]
async fn test_slow_listing_is_a_navigation_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(1))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    // Client and navigation bounds are equal, so either timer may fire first
    let timeout = Duration::from_millis(300);
    let browser = HttpBrowser::from_session(&SessionConfig::default(), None, timeout).unwrap();
    let mut index = DocumentIndex::new(browser.open_page().await.unwrap(), timeout);

    let url = format!("{}{}", server.uri(), LISTING_PATH);
    let result = index.list_cases(&url).await;
    index.close().await;

    match result {
        Err(HarvestError::NavigationTimeout {
            url: failed,
            timeout_ms,
        }) => {
            assert_eq!(failed, url);
            assert_eq!(timeout_ms, 300);
        }
        other => panic!("expected a navigation timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_view_mode_selection_loads_full_document() {
    let server = start_repository(3).await;
    let mut page = browser().open_page().await.unwrap();
    let body = TargetDescriptor::structural("div.doc-body.full-display-mode");
    let view_mode = TargetDescriptor::new("View mode", "combobox", "select")
        .with_structural_path("select.doc-controls-select.doc-controls-view-mode");

    page.navigate(&format!("{}/cases/3", server.uri()))
        .await
        .unwrap();
    assert!(page
        .locate(Strategy::StructuralPath, &body)
        .await
        .unwrap()
        .is_none());

    let selected = quick_resolver()
        .resolve(page.as_mut(), &view_mode, Action::SelectOption("full"))
        .await
        .unwrap();
    assert_eq!(selected, Resolved::Selected);
    assert_eq!(
        page.current_url(),
        Some(format!("{}/cases/3?view_mode=full", server.uri()))
    );

    let text = quick_resolver()
        .resolve(page.as_mut(), &body, Action::ExtractText)
        .await
        .unwrap()
        .into_content()
        .unwrap();
    assert!(text.contains("Vitals stable."));

    // Choosing the mode already shown does not reload
    let requests = server.received_requests().await.unwrap_or_default().len();
    quick_resolver()
        .resolve(page.as_mut(), &view_mode, Action::SelectOption("full"))
        .await
        .unwrap();
    assert_eq!(
        server.received_requests().await.unwrap_or_default().len(),
        requests
    );
}

#[tokio::test]
async fn test_click_follows_case_link() {
    let server = start_repository(2).await;
    let mut page = browser().open_page().await.unwrap();
    let resolver = quick_resolver();

    page.navigate(&format!("{}{}", server.uri(), LISTING_PATH))
        .await
        .unwrap();
    page.wait_for_load(LoadState::DomContentLoaded).await.unwrap();

    let clicked = resolver
        .resolve(
            page.as_mut(),
            &TargetDescriptor::new("Case 2", "link", "a"),
            Action::Click,
        )
        .await
        .unwrap();
    assert_eq!(clicked, Resolved::Clicked);
    assert_eq!(page.current_url(), Some(format!("{}/cases/2", server.uri())));

    let markup = page_markup(page.as_mut()).await.unwrap();
    assert!(markup.contains("Patient 2 presented"));

    page.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_target_exhausts_resolver() {
    let server = start_repository(1).await;
    let mut page = browser().open_page().await.unwrap();
    page.navigate(&format!("{}{}", server.uri(), LISTING_PATH))
        .await
        .unwrap();

    let result = quick_resolver()
        .resolve(
            page.as_mut(),
            &TargetDescriptor::new("Case 7", "link", "a"),
            Action::Click,
        )
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Resolution { attempts: 2, .. })
    ));
    // A failed resolution never navigates away
    assert_eq!(
        page.current_url(),
        Some(format!("{}{}", server.uri(), LISTING_PATH))
    );
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let mut page = browser().open_page().await.unwrap();
    let result = page.navigate(&format!("{}/gone", server.uri())).await;

    assert!(matches!(result, Err(BrowserError::Status { status: 410, .. })));
    assert!(page.current_url().is_none());
}

#[tokio::test]
async fn test_session_cookie_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("cookie", "_session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let browser = HttpBrowser::from_session(
        &SessionConfig::default(),
        Some("_session=abc123"),
        Duration::from_secs(5),
    )
    .unwrap();
    let mut page = browser.open_page().await.unwrap();
    page.navigate(&format!("{}/private", server.uri()))
        .await
        .unwrap();

    let found = page
        .locate(Strategy::VisibleText, &TargetDescriptor::new("ok", "", ""))
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn test_scheduler_bounds_concurrent_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>slow</body></html>")
                .set_delay(Duration::from_millis(40)),
        )
        .mount(&server)
        .await;

    let browser = Arc::new(browser());
    let url = format!("{}/slow", server.uri());
    let mut scheduler = ConcurrencyScheduler::new(3);

    for i in 0..12 {
        let browser = Arc::clone(&browser);
        let url = url.clone();
        scheduler
            .submit(format!("fetch {}", i), async move {
                let mut page = browser.open_page().await?;
                let navigated = page.navigate(&url).await;
                page.close().await?;
                Ok::<(), HarvestError>(navigated?)
            })
            .await
            .unwrap();
        assert!(scheduler.in_flight() <= 3);
    }

    let report = scheduler.join().await;
    assert_eq!(report.succeeded, 12);
    assert_eq!(report.failed, 0);
    assert!(report.peak_in_flight <= 3);
    assert_eq!(
        server.received_requests().await.unwrap_or_default().len(),
        12
    );
}
