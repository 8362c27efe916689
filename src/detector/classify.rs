//! The detection heuristic: URL first, then title, then body text. Each
//! stage only runs when every earlier stage found nothing, so a URL match
//! always beats a title match and a title match always beats content.

use crate::detector::keywords;
use crate::domain::{DocumentCategory, PageSignal};

/// Run the full three-signal pass. `threshold` is the number of distinct
/// phrase hits body text needs before it counts as a match.
pub fn classify(signal: &PageSignal, threshold: usize) -> Option<DocumentCategory> {
    from_url(&signal.url)
        .or_else(|| from_title(&signal.title))
        .or_else(|| from_content(&signal.body_prefix, threshold))
}

/// Match keyword phrases against the URL. Multi-word phrases are tried as
/// hyphenated, underscored and joined variants, since that is how they show
/// up in paths like `/terms-of-service` or `/privacy_policy`.
pub fn from_url(url: &str) -> Option<DocumentCategory> {
    let url = url.to_lowercase();
    for (category, phrases) in keywords::table() {
        for phrase in phrases {
            if url_variants(phrase).iter().any(|variant| url.contains(variant.as_str())) {
                return Some(category);
            }
        }
    }
    None
}

pub fn from_title(title: &str) -> Option<DocumentCategory> {
    let title = title.to_lowercase();
    for (category, phrases) in keywords::table() {
        if phrases.iter().any(|phrase| title.contains(phrase)) {
            return Some(category);
        }
    }
    None
}

/// A single phrase somewhere in a page body is weak evidence; footers link
/// legal pages from everywhere. Require `threshold` distinct phrases.
pub fn from_content(body_prefix: &str, threshold: usize) -> Option<DocumentCategory> {
    for (category, phrases) in keywords::table() {
        let hits = phrases
            .iter()
            .filter(|phrase| body_prefix.contains(*phrase))
            .count();
        if hits >= threshold {
            return Some(category);
        }
    }
    None
}

fn url_variants(phrase: &str) -> [String; 3] {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    [words.join("-"), words.join("_"), words.join("")]
}
