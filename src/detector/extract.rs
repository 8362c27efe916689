//! HTML to `PageSnapshot`. Parsing happens once, here; everything after
//! this point works with plain strings.

use dom_query::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::domain::PageSnapshot;

/// Content regions tried in order when picking the document text. First
/// existing region wins, even when its text is empty.
pub const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role=\"main\"]",
    ".content",
    ".main-content",
    ".page-content",
    ".legal-content",
    ".terms-content",
    ".privacy-content",
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn parse_snapshot(url: Url, html: &str) -> PageSnapshot {
    let document = Document::from(html);

    // Script and style text is not visible page text.
    document.select("script, style, noscript").remove();

    let title = normalize(&document.select("title").first().text());
    let body_text = normalize(&document.select("body").text());
    let main_region = CONTENT_SELECTORS.iter().find_map(|selector| {
        let selection = document.select(selector);
        if selection.exists() {
            Some(normalize(&selection.first().text()))
        } else {
            None
        }
    });

    PageSnapshot {
        url,
        title,
        body_text,
        main_region,
    }
}

fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
