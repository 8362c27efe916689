//! HTTP transport to the analysis service. One POST per document; the
//! verdict comes back as JSON and is carried through untouched.

use reqwest::Client;
use serde::Serialize;

use crate::config::env::AnalysisConfig;
use crate::domain::{AnalysisRequest, AnalysisResult};
use crate::protocol::AnalysisError;

/// Wire shape of the analyze call. The service wants a flat document type
/// string; an unclassified document goes out as a generic legal one.
#[derive(Debug, Serialize)]
struct AnalyzeBody<'a> {
    content: &'a str,
    document_type: &'a str,
}

#[derive(Clone)]
pub struct AnalysisClient {
    http: Client,
    config: AnalysisConfig,
}

impl AnalysisClient {
    pub fn new(http: Client, config: AnalysisConfig) -> Self {
        Self { http, config }
    }

    pub fn endpoint(&self) -> &str {
        self.config.endpoint.as_str()
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let document_type = request
            .category
            .map(|category| category.as_str())
            .unwrap_or("legal");
        let body = AnalyzeBody {
            content: &request.content,
            document_type,
        };

        tracing::info!(
            target: "analysis",
            document_type,
            content_len = request.content.len(),
            "requesting analysis"
        );

        let response = self
            .http
            .post(self.config.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(target: "analysis", error = %err, "analysis service unreachable");
                AnalysisError::ServiceUnreachable {
                    endpoint: self.config.endpoint.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(target: "analysis", status = status.as_u16(), "analysis service error");
            return Err(AnalysisError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<AnalysisResult>()
            .await
            .map_err(|err| AnalysisError::ServiceError {
                status: status.as_u16(),
                body: format!("invalid analysis payload: {err}"),
            })
    }
}
