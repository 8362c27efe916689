use url::Url;

/// Everything the scanner keeps of a rendered page. Extracted once when the
/// page is parsed; detection and analysis work from these strings only.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: Url,
    pub title: String,
    /// Visible page text with runs of whitespace collapsed to single spaces.
    pub body_text: String,
    /// Text of the first structural content region found, if any.
    pub main_region: Option<String>,
}

/// Signals a single classification pass looks at. Derived fresh from the
/// snapshot on every pass, never cached.
#[derive(Debug, Clone)]
pub struct PageSignal {
    pub url: String,
    pub title: String,
    pub body_prefix: String,
}

impl PageSnapshot {
    /// Snapshot of a page with no readable content, e.g. a privileged
    /// browser page.
    pub fn empty(url: Url) -> Self {
        Self {
            url,
            title: String::new(),
            body_text: String::new(),
            main_region: None,
        }
    }

    pub fn signal(&self, prefix_chars: usize) -> PageSignal {
        let lowered = self.body_text.to_lowercase();
        PageSignal {
            url: self.url.as_str().to_string(),
            title: self.title.clone(),
            body_prefix: lowered.chars().take(prefix_chars).collect(),
        }
    }

    /// Document text handed to analysis: the main content region when one
    /// exists, otherwise the whole visible body.
    pub fn content(&self) -> String {
        self.main_region
            .as_deref()
            .unwrap_or(&self.body_text)
            .trim()
            .to_string()
    }
}
