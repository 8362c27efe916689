//! Static phrase tables behind the detection heuristic. Order matters:
//! categories are checked terms first, legal last, and the first hit wins.

use crate::domain::DocumentCategory;

pub const CATEGORY_ORDER: [DocumentCategory; 3] = DocumentCategory::ALL;

const TERMS_PHRASES: &[&str] = &[
    "terms of service",
    "terms of use",
    "user agreement",
    "service agreement",
    "terms and conditions",
];

const PRIVACY_PHRASES: &[&str] = &[
    "privacy policy",
    "privacy notice",
    "data protection",
    "cookie policy",
    "privacy statement",
];

const LEGAL_PHRASES: &[&str] = &[
    "legal agreement",
    "license agreement",
    "end user license",
    "eula",
    "legal notice",
    "disclaimer",
];

pub fn phrases(category: DocumentCategory) -> &'static [&'static str] {
    match category {
        DocumentCategory::Terms => TERMS_PHRASES,
        DocumentCategory::Privacy => PRIVACY_PHRASES,
        DocumentCategory::Legal => LEGAL_PHRASES,
    }
}

/// Iterate categories with their phrase lists, in priority order.
pub fn table() -> impl Iterator<Item = (DocumentCategory, &'static [&'static str])> {
    CATEGORY_ORDER.iter().map(|&category| (category, phrases(category)))
}
