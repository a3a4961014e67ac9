use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{ExternalServiceError, PdfRenderer, required_env};

const SERVICE: &str = "pdf-renderer";

const TASKBILL_RENDERER_URL: &str = "TASKBILL_RENDERER_URL";

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    html: &'a str,
}

/// HTTP rendering service: POST the invoice HTML, receive PDF bytes back.
pub struct RemotePdfRenderer {
    client: reqwest::Client,
}

impl RemotePdfRenderer {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for RemotePdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PdfRenderer for RemotePdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, ExternalServiceError> {
        let url = required_env(TASKBILL_RENDERER_URL)?;

        let response = self
            .client
            .post(url)
            .json(&RenderRequest { html })
            .send()
            .await
            .map_err(|source| ExternalServiceError::Http {
                service: SERVICE,
                source,
            })?;

        if !response.status().is_success() {
            return Err(ExternalServiceError::from_response(SERVICE, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ExternalServiceError::invalid(SERVICE, err.to_string()))?;

        if bytes.is_empty() {
            return Err(ExternalServiceError::invalid(SERVICE, "empty document"));
        }
        Ok(bytes.to_vec())
    }
}
