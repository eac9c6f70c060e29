//! Client for the external analysis engine
//!
//! Two synchronous request/response calls, no retries:
//! `POST /upload-transactions` (multipart `file`) and `POST /explain-node`.

use crate::upload::UploadFile;
use crate::{AccountNode, AnalysisResult, NodeMetrics, TransportError};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const UPLOAD_PATH: &str = "/upload-transactions";
const EXPLAIN_PATH: &str = "/explain-node";

/// Body of an explanation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub node_id: String,
    pub risk_score: f64,
    pub metrics: NodeMetrics,
}

impl ExplainRequest {
    pub fn for_node(node: &AccountNode) -> Self {
        Self {
            node_id: node.id.clone(),
            risk_score: node.risk,
            metrics: node.metrics,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExplainResponse {
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Analysis engine operations used by the console
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload a transaction CSV and return the analysis
    async fn upload_transactions(&self, file: &UploadFile) -> Result<AnalysisResult, TransportError>;

    /// Request a narrative explanation for one account
    async fn explain_node(&self, request: &ExplainRequest) -> Result<String, TransportError>;
}

/// HTTP implementation over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into `Rejected`, keeping any `detail`
    async fn rejection(response: Response) -> TransportError {
        let status = response.status().as_u16();
        let detail = match response.text().await {
            Ok(body) => serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail),
            Err(_) => None,
        };
        warn!(status, detail = ?detail, "Engine rejected request");
        TransportError::Rejected { status, detail }
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn upload_transactions(&self, file: &UploadFile) -> Result<AnalysisResult, TransportError> {
        let part = multipart::Part::bytes(file.contents().to_vec())
            .file_name(file.name().to_string())
            .mime_str("text/csv")
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        debug!(file = %file.name(), bytes = file.len(), "Uploading transactions");
        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body = response.text().await.map_err(map_send_error)?;
        AnalysisResult::from_json(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn explain_node(&self, request: &ExplainRequest) -> Result<String, TransportError> {
        let response = self
            .client
            .post(self.url(EXPLAIN_PATH))
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body = response.text().await.map_err(map_send_error)?;
        serde_json::from_str::<ExplainResponse>(&body)
            .map(|r| r.explanation)
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::node;

    #[test]
    fn test_explain_request_body() {
        let mut account = node("ACC1", 85.0, Some("RING_001"));
        account.metrics = NodeMetrics {
            in_degree: 6,
            out_degree: 1,
            degree: 7,
        };

        let body = serde_json::to_value(ExplainRequest::for_node(&account)).unwrap();
        assert_eq!(body["node_id"], "ACC1");
        assert_eq!(body["risk_score"], 85.0);
        assert_eq!(body["metrics"]["in_degree"], 6);
        assert_eq!(body["metrics"]["degree"], 7);
        assert_eq!(body.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_base_url_normalized() {
        let client = HttpAnalysisClient::new("http://localhost:8000/", Duration::from_secs(5));
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.url(UPLOAD_PATH),
            "http://localhost:8000/upload-transactions"
        );
    }

    #[test]
    fn test_error_body_detail() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "Only CSV files are allowed."}"#).unwrap();
        assert_eq!(body.detail.as_deref(), Some("Only CSV files are allowed."));

        let empty: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(empty.detail.is_none());
    }
}
