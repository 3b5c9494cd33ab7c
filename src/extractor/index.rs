//! Case listing for course repository pages

use crate::browser::{page_markup, BrowserError, LoadState, Page};
use crate::HarvestError;
use scraper::{Html, Selector};
use std::time::Duration;

/// Selector for the case links of a repository page
const CASE_LINK_SELECTOR: &str = "a.case-name-link";

/// Navigates `page` to `url`, failing with `NavigationTimeout` once `timeout`
/// expires
///
/// A timeout raised by the backend itself is reported the same way, whichever
/// timer fires first.
pub(crate) async fn navigate_within(
    page: &mut dyn Page,
    url: &str,
    timeout: Duration,
) -> Result<(), HarvestError> {
    let navigation_timeout = || HarvestError::NavigationTimeout {
        url: url.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    };

    match tokio::time::timeout(timeout, page.navigate(url)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(BrowserError::Timeout { .. })) | Err(_) => Err(navigation_timeout()),
        Ok(Err(e)) => Err(e.into()),
    }
}

/// Extracts the case names listed in a repository page's markup
///
/// Names are trimmed and returned in document order. Duplicates are kept.
pub fn parse_case_names(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);
    let Ok(selector) = Selector::parse(CASE_LINK_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect()
}

/// Lists cases through one shared page
///
/// Used only during enumeration; scrape jobs open pages of their own.
pub struct DocumentIndex {
    page: Box<dyn Page>,
    navigation_timeout: Duration,
}

impl DocumentIndex {
    pub fn new(page: Box<dyn Page>, navigation_timeout: Duration) -> Self {
        Self {
            page,
            navigation_timeout,
        }
    }

    /// Returns the case names listed at the repository `url`
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - Trimmed names in document order, possibly empty
    /// * `Err(HarvestError)` - Navigation or markup retrieval failed
    pub async fn list_cases(&mut self, url: &str) -> Result<Vec<String>, HarvestError> {
        navigate_within(self.page.as_mut(), url, self.navigation_timeout).await?;
        self.page.wait_for_load(LoadState::NetworkIdle).await?;

        let markup = page_markup(self.page.as_mut()).await?;
        let names = parse_case_names(&markup);

        tracing::info!("Found {} cases at {}", names.len(), url);
        Ok(names)
    }

    /// Releases the shared page
    pub async fn close(mut self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!("Failed to close index page: {}", e);
        }
    }
}
