use std::fmt;

use serde::{Deserialize, Serialize};

/// Browser-side identifier of a tab. Stable for the lifetime of the tab,
/// never reused while the tab is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Legal document categories, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Terms,
    Privacy,
    Legal,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 3] = [
        DocumentCategory::Terms,
        DocumentCategory::Privacy,
        DocumentCategory::Legal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Terms => "terms",
            DocumentCategory::Privacy => "privacy",
            DocumentCategory::Legal => "legal",
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::Terms => "Terms of Service",
            DocumentCategory::Privacy => "Privacy Policy",
            DocumentCategory::Legal => "Legal Agreement",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to the analysis service. `category` falls back to
/// a generic legal document on the wire when absent.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub content: String,
    pub category: Option<DocumentCategory>,
}

/// Verdict returned by the analysis service. Carried through unchanged;
/// nothing in the pipeline interprets the individual points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub short_summary: String,
    pub risky_points: Vec<String>,
    pub favourable_points: Vec<String>,
}

/// What the per-tab badge shows at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeView {
    Alert,
    Hidden,
}

impl BadgeView {
    /// Badge text; empty clears the badge.
    pub fn text(&self) -> &'static str {
        match self {
            BadgeView::Alert => "!",
            BadgeView::Hidden => "",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            BadgeView::Alert => "#ef4444",
            BadgeView::Hidden => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&DocumentCategory::Privacy).unwrap();
        assert_eq!(json, "\"privacy\"");
    }

    #[test]
    fn category_order_is_terms_privacy_legal() {
        assert_eq!(
            DocumentCategory::ALL,
            [
                DocumentCategory::Terms,
                DocumentCategory::Privacy,
                DocumentCategory::Legal
            ]
        );
    }

    #[test]
    fn analysis_result_parses_service_payload() {
        let body = r#"{
            "short_summary": "Standard terms with an arbitration clause.",
            "risky_points": ["Mandatory arbitration", "Unilateral changes"],
            "favourable_points": ["30-day notice before changes"]
        }"#;
        let result: AnalysisResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.risky_points.len(), 2);
        assert_eq!(result.favourable_points.len(), 1);
    }
}
