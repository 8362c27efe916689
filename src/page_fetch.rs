use anyhow::{Context, Result, bail};
use reqwest::Client;
use url::Url;

use crate::{config::PageFetchConfig, detector::extract, domain::PageSnapshot};

/// Fetches watched pages over HTTP and turns them into snapshots the
/// detector can work with.
pub struct PageFetcher {
    client: Client,
    config: PageFetchConfig,
}

impl PageFetcher {
    pub fn new(client: Client, config: PageFetchConfig) -> Self {
        Self { client, config }
    }

    pub async fn fetch(&self, raw_url: &str) -> Result<PageSnapshot> {
        let url = Url::parse(raw_url).with_context(|| format!("invalid watch url {raw_url}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("unsupported scheme {} in watch url {url}", url.scheme());
        }

        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{url} returned HTTP {status}");
        }

        let body = response.text().await?;
        Ok(extract::parse_snapshot(url, &body))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fetcher() -> PageFetcher {
        PageFetcher::new(
            Client::new(),
            PageFetchConfig {
                fetch_timeout: Duration::from_secs(10),
            },
        )
    }

    #[tokio::test]
    async fn fetch_parses_the_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/privacy"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Privacy Policy</title></head>\
                 <body><main>What we collect.</main></body></html>",
            ))
            .mount(&server)
            .await;

        let page = fetcher()
            .fetch(&format!("{}/privacy", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.title, "Privacy Policy");
        assert_eq!(page.content(), "What we collect.");
    }

    #[tokio::test]
    async fn http_errors_fail_the_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn non_http_schemes_are_rejected() {
        let err = fetcher().fetch("file:///etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn invalid_urls_are_rejected() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(err.to_string().contains("invalid watch url"));
    }
}
