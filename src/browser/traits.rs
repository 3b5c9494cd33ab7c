//! Page automation traits and error types

use crate::browser::locator::{Strategy, TargetDescriptor};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a page automation backend
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid session header: {0}")]
    InvalidHeader(String),

    #[error("No document loaded")]
    NoDocument,

    #[error("Unknown or stale element handle {0:?}")]
    StaleHandle(ElementHandle),

    #[error("Element is not clickable: {0}")]
    NotClickable(String),

    #[error("Element is not a select control: {0}")]
    NotSelectable(String),

    #[error("No option '{value}' in {control}")]
    NoSuchOption { control: String, value: String },

    #[error("Page is closed")]
    Closed,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Opaque reference to an element located on a page
///
/// Handles are only valid until the page navigates again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// How far a page load must have progressed before continuing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    NetworkIdle,
}

/// One page (tab) of an authenticated browsing context
#[async_trait]
pub trait Page: Send {
    /// Loads `url` into the page
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Waits until the current document reaches `state`
    async fn wait_for_load(&mut self, state: LoadState) -> Result<(), BrowserError>;

    /// Looks for `target` using a single strategy
    ///
    /// Returns `Ok(None)` when nothing matches; errors are reserved for
    /// backend failures.
    async fn locate(
        &mut self,
        strategy: Strategy,
        target: &TargetDescriptor,
    ) -> Result<Option<ElementHandle>, BrowserError>;

    /// Waits up to `timeout` for the element to become visible
    async fn wait_visible(
        &mut self,
        handle: ElementHandle,
        timeout: Duration,
    ) -> Result<bool, BrowserError>;

    /// Clicks the element, following any navigation it triggers
    async fn click(&mut self, handle: ElementHandle, timeout: Duration) -> Result<(), BrowserError>;

    /// Chooses the option of a select control whose value or label equals
    /// `value`, following any navigation the change triggers
    async fn select_option(
        &mut self,
        handle: ElementHandle,
        value: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Returns the concatenated text content of the element
    async fn extract_text(&mut self, handle: ElementHandle) -> Result<String, BrowserError>;

    /// Returns the outer markup of the element
    async fn extract_markup(&mut self, handle: ElementHandle) -> Result<String, BrowserError>;

    /// Releases the page; further calls fail with `BrowserError::Closed`
    async fn close(&mut self) -> Result<(), BrowserError>;

    /// URL of the currently loaded document
    fn current_url(&self) -> Option<String>;
}

/// An authenticated browsing context that hands out pages
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn Page>, BrowserError>;
}

/// Returns the markup of the whole document loaded in `page`
pub async fn page_markup(page: &mut dyn Page) -> Result<String, BrowserError> {
    let root = TargetDescriptor::structural("html");
    match page.locate(Strategy::StructuralPath, &root).await? {
        Some(handle) => page.extract_markup(handle).await,
        None => Err(BrowserError::NoDocument),
    }
}
