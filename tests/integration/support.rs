//! Mock repository shared by the integration tests

use case_harvester::config::{CourseCatalog, CourseEntry, ExtractionConfig};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const COURSE: &str = "Geriatrics";
pub const LISTING_PATH: &str = "/document_sets/4886";

/// View mode control rendered on every case page
const VIEW_MODE_CONTROL: &str = r#"<select class="doc-controls-select doc-controls-view-mode" name="view_mode"><option value="summary" selected>Summary</option><option value="full">Full</option></select>"#;

/// Markup of a case page in its default summary view
pub fn case_page(id: u32) -> String {
    format!(
        r#"<html><head><title>Case {id}</title></head><body>
{VIEW_MODE_CONTROL}
<div class="doc-body summary-display-mode">Case SynopsisPatient {id} presented with a fall.</div>
</body></html>"#
    )
}

/// Markup of a case page in full view, carrying a synopsis and a "Falls"
/// teaching point
pub fn full_case_page(id: u32) -> String {
    format!(
        r#"<html><head><title>Case {id}</title></head><body>
{VIEW_MODE_CONTROL}
<div class="doc-body full-display-mode">CASE SYNOPSISCase SynopsisPatient {id} presented with a fall.Vitals stable.Thank you for completing this case.</div>
<div class="doc-section"><div class="teaching-point-topper">TEACHING POINT</div><h1 class="doc-section-header-title">Falls</h1><div class="doc-section-body"><p>Assess gait.</p><p>Review medications.</p></div></div>
</body></html>"#
    )
}

/// Cleaned synopsis expected for `case_page(id)`
pub fn expected_synopsis(id: u32) -> String {
    format!("Patient {id} presented with a fall.\nVitals stable.")
}

/// Markup of a repository page listing `Case 1` to `Case count`
pub fn listing_page(count: u32) -> String {
    let links: String = (1..=count)
        .map(|id| {
            format!(
                r#"<li><a class="case-name-link case-name-container" href="/cases/{id}">Case {id}</a></li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{links}</ul></body></html>")
}

/// Serves `/cases/{id}`, in full view when `view_mode=full` is requested
struct CasePages;

impl Respond for CasePages {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let full = request
            .url
            .query_pairs()
            .any(|(key, value)| key == "view_mode" && value == "full");

        match request
            .url
            .path()
            .rsplit('/')
            .next()
            .and_then(|id| id.parse::<u32>().ok())
        {
            Some(id) => ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(if full { full_case_page(id) } else { case_page(id) }),
            None => ResponseTemplate::new(404),
        }
    }
}

/// Starts a server with one repository listing `count` cases
pub async fn start_repository(count: u32) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(listing_page(count)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/cases/\d+$"))
        .respond_with(CasePages)
        .mount(&server)
        .await;

    server
}

/// Requests the server received for `request_path`, whatever their query
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

pub fn catalog_for(server: &MockServer) -> CourseCatalog {
    CourseCatalog::new(vec![CourseEntry {
        name: COURSE.to_string(),
        url: format!("{}{}", server.uri(), LISTING_PATH),
    }])
}

pub fn test_extraction_config() -> ExtractionConfig {
    ExtractionConfig {
        max_concurrent_jobs: 4,
        checkpoint_interval: 5,
        retry_attempts: 2,
        retry_delay_ms: 10,
        visibility_timeout_ms: 100,
        navigation_timeout_ms: 5000,
    }
}
