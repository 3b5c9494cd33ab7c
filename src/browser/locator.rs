//! Element location strategies over parsed markup
//!
//! Each strategy is a different way of finding the same logical target.
//! Markup on the repository site is inconsistent between pages, so callers
//! try the strategies in order (see `crate::resolver`).

use scraper::{ElementRef, Html, Selector};
use std::fmt;

/// One method of locating a target element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Element whose visible text equals the label
    VisibleText,

    /// Element whose `title`, `aria-label` or `alt` attribute equals the label
    TitleAttribute,

    /// Element with the hinted role whose accessible name equals the label
    RoleAndName,

    /// Element of the target's kind whose text equals the label, or failing
    /// that contains it as a whole word
    KindContains,

    /// Fixed selector path, used as the last resort
    StructuralPath,
}

impl Strategy {
    /// All strategies in the order they are attempted
    pub const ORDERED: [Strategy; 5] = [
        Strategy::VisibleText,
        Strategy::TitleAttribute,
        Strategy::RoleAndName,
        Strategy::KindContains,
        Strategy::StructuralPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisibleText => "visible_text",
            Self::TitleAttribute => "title_attribute",
            Self::RoleAndName => "role_and_name",
            Self::KindContains => "kind_contains",
            Self::StructuralPath => "structural_path",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical description of an element to find
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    /// Visible text or accessible name of the element
    pub label: String,

    /// ARIA role the element is expected to have ("link", "button", ...)
    pub role_hint: String,

    /// Tag name of the element ("a", "div", ...)
    pub kind: String,

    /// CSS selector path tried when every other strategy fails
    pub structural_path: Option<String>,
}

impl TargetDescriptor {
    pub fn new(label: impl Into<String>, role_hint: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            role_hint: role_hint.into(),
            kind: kind.into(),
            structural_path: None,
        }
    }

    /// Descriptor that can only be found through its selector path
    pub fn structural(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            label: path.clone(),
            role_hint: String::new(),
            kind: String::new(),
            structural_path: Some(path),
        }
    }

    pub fn with_structural_path(mut self, path: impl Into<String>) -> Self {
        self.structural_path = Some(path.into());
        self
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{} <{}>", self.label, self.kind)
        }
    }
}

/// Snapshot of an element found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedElement {
    pub tag: String,

    /// Text nodes concatenated without separators, as a browser's
    /// `textContent` returns them
    pub text: String,

    pub markup: String,

    /// Link target of the element itself, its enclosing anchor, or its first
    /// descendant anchor
    pub href: Option<String>,

    pub visible: bool,
}

/// Finds the first element of `html` matching `target` under `strategy`
pub fn locate_in_document(
    html: &str,
    strategy: Strategy,
    target: &TargetDescriptor,
) -> Option<LocatedElement> {
    let document = Html::parse_document(html);
    let label = target.label.trim();

    let found = match strategy {
        Strategy::VisibleText => {
            if label.is_empty() {
                return None;
            }
            all_elements(&document)
                .find(|el| normalized_text(el) == label && !has_child_with_text(el, label))
        }
        Strategy::TitleAttribute => {
            if label.is_empty() {
                return None;
            }
            all_elements(&document).find(|el| {
                ["title", "aria-label", "alt"]
                    .iter()
                    .any(|attr| el.value().attr(attr).map(str::trim) == Some(label))
            })
        }
        Strategy::RoleAndName => {
            if label.is_empty() || target.role_hint.is_empty() {
                return None;
            }
            all_elements(&document).find(|el| {
                role_of(el) == Some(target.role_hint.as_str())
                    && (el.value().attr("aria-label").map(str::trim) == Some(label)
                        || normalized_text(el) == label)
            })
        }
        Strategy::KindContains => {
            if label.is_empty() {
                return None;
            }
            let selector = Selector::parse(&target.kind).ok()?;
            let candidates: Vec<ElementRef> = document.select(&selector).collect();
            candidates
                .iter()
                .find(|el| normalized_text(el) == label)
                .or_else(|| {
                    candidates
                        .iter()
                        .find(|el| contains_word(&normalized_text(el), label))
                })
                .copied()
        }
        Strategy::StructuralPath => {
            let path = target.structural_path.as_deref()?;
            let selector = Selector::parse(path).ok()?;
            document.select(&selector).next()
        }
    };

    found.map(|el| LocatedElement {
        tag: el.value().name().to_string(),
        text: el.text().collect(),
        markup: el.html(),
        href: link_target(&el),
        visible: is_visible(&el),
    })
}

fn all_elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
}

/// Element text with whitespace runs collapsed to single spaces
fn normalized_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `label` occurs in `text` with no letter or digit on either side
fn contains_word(text: &str, label: &str) -> bool {
    text.match_indices(label).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + label.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// True when a child element carries the same text, so the deeper element
/// is the better match
fn has_child_with_text(el: &ElementRef, label: &str) -> bool {
    el.children()
        .filter_map(ElementRef::wrap)
        .any(|child| normalized_text(&child) == label)
}

fn role_of<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    let element = el.value();
    if let Some(role) = element.attr("role") {
        return Some(role);
    }

    match element.name() {
        "a" | "area" if element.attr("href").is_some() => Some("link"),
        "button" => Some("button"),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some("heading"),
        "select" => Some("combobox"),
        "option" => Some("option"),
        "input" => match element.attr("type").unwrap_or("text") {
            "submit" | "button" | "reset" => Some("button"),
            "checkbox" => Some("checkbox"),
            "radio" => Some("radio"),
            _ => Some("textbox"),
        },
        "textarea" => Some("textbox"),
        "nav" => Some("navigation"),
        "main" => Some("main"),
        "article" => Some("article"),
        "ul" | "ol" => Some("list"),
        "li" => Some("listitem"),
        _ => None,
    }
}

fn link_target(el: &ElementRef) -> Option<String> {
    if let Some(href) = el.value().attr("href") {
        return Some(href.to_string());
    }

    let enclosing = el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|ancestor| match ancestor.value().name() {
            "a" => ancestor.value().attr("href"),
            _ => None,
        });
    if let Some(href) = enclosing {
        return Some(href.to_string());
    }

    el.descendants()
        .filter_map(ElementRef::wrap)
        .find_map(|child| match child.value().name() {
            "a" => child.value().attr("href"),
            _ => None,
        })
        .map(str::to_string)
}

fn is_visible(el: &ElementRef) -> bool {
    std::iter::once(*el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .all(|node| {
            let element = node.value();
            let hidden_style = element
                .attr("style")
                .map(|style| style.replace(' ', "").contains("display:none"))
                .unwrap_or(false);
            element.attr("hidden").is_none()
                && element.attr("aria-hidden") != Some("true")
                && !hidden_style
        })
}
