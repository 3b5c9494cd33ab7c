//! Page automation for the harvester
//!
//! The coordinator only talks to the `Browser` and `Page` traits. The crate
//! ships an HTTP-backed implementation that treats navigation as a GET,
//! clicking a link as following its `href`, and locates elements in the
//! parsed markup; a full browser driver can be plugged in behind the same
//! traits.

mod http;
mod locator;
mod traits;

pub use http::{build_http_client, HttpBrowser, HttpPage};
pub use locator::{locate_in_document, LocatedElement, Strategy, TargetDescriptor};
pub use traits::{page_markup, Browser, BrowserError, ElementHandle, LoadState, Page};
