use crate::HarvestError;
use regex::Regex;
use std::sync::LazyLock;

/// Header that opens the synopsis section of a case page
pub const SYNOPSIS_START_MARKER: &str = "Case Synopsis";

/// Closing banner that follows the synopsis on every case page
pub const SYNOPSIS_END_MARKER: &str = "Thank you for completing";

static BANNER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:CASE SYNOPSIS|TEACHING POINT)\b").unwrap());

static HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Case Synopsis|Teaching Point)([A-Z])").unwrap());

static CAMEL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());

static SENTENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([.?])([A-Z])").unwrap());

static COLON_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(:)([a-zA-Z])").unwrap());

static NUMBERED_ITEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^0-9])(\d+\.)").unwrap());

static LETTERED_ITEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^a-zA-Z\s])([a-zA-Z]\.)").unwrap());

static PAREN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\))([a-zA-Z])").unwrap());

/// Inserts the line breaks that flattening removed
///
/// Rule order matters: every rule assumes the ones above it already ran.
///
/// 1. Upper-case section banners are dropped and a header glued to its body
///    gets a line break.
/// 2. A lower-to-upper case transition is a joined word boundary.
/// 3. `.` or `?` followed by a capital is a sentence boundary.
/// 4. `:` followed by a letter starts a new line.
/// 5. Numbered (`12.`) and lettered (`b.`) list markers start a new line.
/// 6. A closing parenthesis followed by a letter starts a new line.
pub fn segment(text: &str) -> String {
    let text = BANNER_REGEX.replace_all(text, "");
    let text = HEADER_REGEX.replace_all(&text, "${1}\n${2}");
    let text = CAMEL_REGEX.replace_all(&text, "${1}\n${2}");
    let text = SENTENCE_REGEX.replace_all(&text, "${1}\n${2}");
    let text = COLON_REGEX.replace_all(&text, "${1}\n${2}");
    let text = NUMBERED_ITEM_REGEX.replace_all(&text, "${1}\n${2}");
    let text = LETTERED_ITEM_REGEX.replace_all(&text, "${1}\n${2}");
    let text = PAREN_REGEX.replace_all(&text, "${1}\n${2}");
    text.into_owned()
}

/// Returns the text strictly between `start_marker` and the next `end_marker`
///
/// No partial result is produced: a missing marker is an error.
pub fn extract_span<'a>(
    text: &'a str,
    start_marker: &str,
    end_marker: &str,
) -> Result<&'a str, HarvestError> {
    let start = text
        .find(start_marker)
        .map(|index| index + start_marker.len())
        .ok_or_else(|| HarvestError::MarkerNotFound {
            marker: start_marker.to_string(),
        })?;

    let end = text[start..]
        .find(end_marker)
        .map(|offset| start + offset)
        .ok_or_else(|| HarvestError::MarkerNotFound {
            marker: end_marker.to_string(),
        })?;

    Ok(&text[start..end])
}

/// Pulls the synopsis out of a case page's text and cleans it
pub fn parse_synopsis(page_text: &str) -> Result<String, HarvestError> {
    let raw = extract_span(page_text, SYNOPSIS_START_MARKER, SYNOPSIS_END_MARKER)?;
    Ok(segment(raw.trim()))
}
