use alliance_dom::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute on `<body>` or `<html>` that names the page explicitly
pub const PAGE_ATTRIBUTE: &str = "data-page";

/// Normalized page identifier used for every content API lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSlug(String);

impl PageSlug {
    pub const INDEX: &'static str = "index";

    pub fn new(raw: impl AsRef<str>) -> Self {
        let slug = raw.as_ref().trim().to_lowercase();
        if slug.is_empty() {
            Self(Self::INDEX.to_string())
        } else {
            Self(slug)
        }
    }

    /// Derive the slug from a request path.
    ///
    /// `/` → `index`, `/tutors.html` → `tutors`, `/blog/` → `blog`,
    /// `/about/index.html` → `about`.
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(strip_html_extension)
            .collect();

        match segments.as_slice() {
            [] => Self::new(Self::INDEX),
            [.., parent, last] if last.eq_ignore_ascii_case(Self::INDEX) => Self::new(parent),
            [.., last] => Self::new(last),
        }
    }

    /// An explicit `data-page` attribute wins over the path
    pub fn for_document(document: &Document, path: &str) -> Self {
        ["body", "html"]
            .iter()
            .filter_map(|tag| document.find_tag(tag))
            .filter_map(|node_path| document.node_at(&node_path))
            .find_map(|node| node.attr(PAGE_ATTRIBUTE).filter(|v| !v.trim().is_empty()))
            .map(Self::new)
            .unwrap_or_else(|| Self::from_path(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn strip_html_extension(segment: &str) -> &str {
    segment
        .strip_suffix(".html")
        .or_else(|| segment.strip_suffix(".htm"))
        .unwrap_or(segment)
}

impl fmt::Display for PageSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PageSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
