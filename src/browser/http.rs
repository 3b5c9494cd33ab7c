//! HTTP-backed page automation
//!
//! This backend covers repository pages that render server side:
//! - navigation is a GET through a shared, pre-authenticated client
//! - locating runs the strategy over the parsed markup
//! - clicking follows the element's link target
//! - selecting an option loads the document the option stands for
//! - load states are reached as soon as the body has been read

use crate::browser::locator::{locate_in_document, LocatedElement, Strategy, TargetDescriptor};
use crate::browser::traits::{Browser, BrowserError, ElementHandle, LoadState, Page};
use crate::config::SessionConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client carrying the session's identity
///
/// # Arguments
///
/// * `session` - The session configuration (user agent)
/// * `cookie` - Cookie header of an already authenticated session, if any
/// * `timeout` - Upper bound on a single request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(BrowserError)` - The cookie is not a valid header value or the client failed to build
pub fn build_http_client(
    session: &SessionConfig,
    cookie: Option<&str>,
    timeout: Duration,
) -> Result<Client, BrowserError> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie {
        let mut value = HeaderValue::from_str(cookie)
            .map_err(|e| BrowserError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    let client = Client::builder()
        .user_agent(session.user_agent.clone())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Browsing context backed by a shared HTTP client
#[derive(Clone)]
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the browser from configuration
    pub fn from_session(
        session: &SessionConfig,
        cookie: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, BrowserError> {
        Ok(Self::new(build_http_client(session, cookie, timeout)?))
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        Ok(Box::new(HttpPage::new(self.client.clone())))
    }
}

struct LoadedDocument {
    url: Url,
    body: String,
}

/// A single page of the HTTP backend
pub struct HttpPage {
    client: Client,
    document: Option<LoadedDocument>,
    elements: HashMap<ElementHandle, LocatedElement>,
    next_handle: u64,
    closed: bool,
}

impl HttpPage {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            document: None,
            elements: HashMap::new(),
            next_handle: 1,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    fn element(&self, handle: ElementHandle) -> Result<&LocatedElement, BrowserError> {
        self.ensure_open()?;
        self.elements
            .get(&handle)
            .ok_or(BrowserError::StaleHandle(handle))
    }

    async fn load(&mut self, url: Url) -> Result<(), BrowserError> {
        let url_str = url.to_string();
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                BrowserError::Timeout {
                    url: url_str.clone(),
                }
            } else {
                BrowserError::Http {
                    url: url_str.clone(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| BrowserError::Http {
            url: url_str.clone(),
            source: e,
        })?;

        tracing::trace!("Loaded {} ({} bytes)", final_url, body.len());

        // Handles never survive a navigation
        self.elements.clear();
        self.document = Some(LoadedDocument {
            url: final_url,
            body,
        });
        Ok(())
    }

    /// Loads `target` as the result of acting on the current document
    async fn follow(&mut self, target: Url, timeout: Duration) -> Result<(), BrowserError> {
        let target_str = target.to_string();
        match tokio::time::timeout(timeout, self.load(target)).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout { url: target_str }),
        }
    }
}

/// Works out the document a select control switches to when `value` is chosen
///
/// An option's `data-url` wins. Otherwise the control's `name` is set as a
/// query parameter of the current document, replacing any earlier value.
fn selection_url(base: &Url, control_markup: &str, value: &str) -> Result<Url, BrowserError> {
    let fragment = Html::parse_fragment(control_markup);
    let (Ok(select_selector), Ok(option_selector)) =
        (Selector::parse("select"), Selector::parse("option"))
    else {
        return Err(BrowserError::NotSelectable(control_markup.to_string()));
    };

    let control = fragment
        .select(&select_selector)
        .next()
        .ok_or_else(|| BrowserError::NotSelectable(control_markup.to_string()))?;
    let name = control.value().attr("name");
    let describe = || {
        name.or_else(|| control.value().attr("class"))
            .unwrap_or("select")
            .to_string()
    };

    let option = control
        .select(&option_selector)
        .find(|option| {
            option.value().attr("value").map(str::trim) == Some(value)
                || option.text().collect::<String>().trim() == value
        })
        .ok_or_else(|| BrowserError::NoSuchOption {
            control: describe(),
            value: value.to_string(),
        })?;

    if let Some(href) = option.value().attr("data-url") {
        return base.join(href).map_err(|e| BrowserError::InvalidUrl {
            url: href.to_string(),
            message: e.to_string(),
        });
    }

    let name = name.ok_or_else(|| BrowserError::NotSelectable(format!("{} has no name", describe())))?;
    let chosen = option.value().attr("value").unwrap_or(value);

    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, val)| (key.into_owned(), val.into_owned()))
        .collect();

    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(name, chosen);
    Ok(url)
}

#[async_trait]
impl Page for HttpPage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let parsed = Url::parse(url).map_err(|e| BrowserError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.load(parsed).await
    }

    async fn wait_for_load(&mut self, _state: LoadState) -> Result<(), BrowserError> {
        self.ensure_open()?;
        if self.document.is_none() {
            return Err(BrowserError::NoDocument);
        }
        Ok(())
    }

    async fn locate(
        &mut self,
        strategy: Strategy,
        target: &TargetDescriptor,
    ) -> Result<Option<ElementHandle>, BrowserError> {
        self.ensure_open()?;
        let document = self.document.as_ref().ok_or(BrowserError::NoDocument)?;

        let Some(found) = locate_in_document(&document.body, strategy, target) else {
            return Ok(None);
        };

        let handle = ElementHandle(self.next_handle);
        self.next_handle += 1;
        self.elements.insert(handle, found);
        Ok(Some(handle))
    }

    async fn wait_visible(
        &mut self,
        handle: ElementHandle,
        _timeout: Duration,
    ) -> Result<bool, BrowserError> {
        // A fetched document never changes, so there is nothing to wait for
        Ok(self.element(handle)?.visible)
    }

    async fn click(&mut self, handle: ElementHandle, timeout: Duration) -> Result<(), BrowserError> {
        let element = self.element(handle)?;
        let href = element
            .href
            .clone()
            .ok_or_else(|| BrowserError::NotClickable(format!("<{}> has no link target", element.tag)))?;

        let document = self.document.as_ref().ok_or(BrowserError::NoDocument)?;
        let target = document
            .url
            .join(&href)
            .map_err(|e| BrowserError::InvalidUrl {
                url: href.clone(),
                message: e.to_string(),
            })?;

        self.follow(target, timeout).await
    }

    async fn select_option(
        &mut self,
        handle: ElementHandle,
        value: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let element = self.element(handle)?;
        if element.tag != "select" {
            return Err(BrowserError::NotSelectable(format!("<{}>", element.tag)));
        }

        let document = self.document.as_ref().ok_or(BrowserError::NoDocument)?;
        let target = selection_url(&document.url, &element.markup, value)?;
        if target == document.url {
            return Ok(());
        }

        tracing::trace!("Selecting '{}' loads {}", value, target);
        self.follow(target, timeout).await
    }

    async fn extract_text(&mut self, handle: ElementHandle) -> Result<String, BrowserError> {
        Ok(self.element(handle)?.text.clone())
    }

    async fn extract_markup(&mut self, handle: ElementHandle) -> Result<String, BrowserError> {
        Ok(self.element(handle)?.markup.clone())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        self.document = None;
        self.elements.clear();
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.document.as_ref().map(|doc| doc.url.to_string())
    }
}
