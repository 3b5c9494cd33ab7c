//! Extraction of the text units stored per case

use crate::text::segment;
use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};

/// Raw capture of one case page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedUnit {
    /// Rendered text of the document body
    pub text: String,

    /// Markup of the whole page
    pub markup: String,
}

fn first_match<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    scope.select(&selector).next()
}

/// Text nodes under `element`, trimmed, blank ones dropped, one per line
fn text_lines(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts and segments the body of the teaching point section titled `name`
///
/// A teaching point section is a `doc-section` div carrying a
/// `teaching-point-topper`; its title is the `doc-section-header-title`
/// heading and its content the `doc-section-body`.
///
/// # Returns
///
/// * `Ok(String)` - The segmented section text
/// * `Err(HarvestError::TeachingPointNotFound)` - No section carries that title
pub fn parse_teaching_point(markup: &str, name: &str) -> Result<String, HarvestError> {
    let document = Html::parse_document(markup);
    let wanted = name.trim();

    let sections = Selector::parse("div[class*='doc-section']").map_err(|_| {
        HarvestError::TeachingPointNotFound {
            name: name.to_string(),
        }
    })?;

    for section in document.select(&sections) {
        if first_match(section, "div[class*='teaching-point-topper']").is_none() {
            continue;
        }

        let Some(header) = first_match(section, "h1[class*='doc-section-header-title']") else {
            continue;
        };
        if header.text().collect::<String>().trim() != wanted {
            continue;
        }

        if let Some(body) = first_match(section, "div[class*='doc-section-body']") {
            tracing::debug!("Located teaching point section '{}'", wanted);
            return Ok(segment(&text_lines(body)));
        }
    }

    Err(HarvestError::TeachingPointNotFound {
        name: name.to_string(),
    })
}
