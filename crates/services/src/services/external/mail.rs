use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ExternalServiceError, MailRelay, OutboundEmail, required_env};

const SERVICE: &str = "mail-relay";

const TASKBILL_MAIL_RELAY_URL: &str = "TASKBILL_MAIL_RELAY_URL";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    attachment: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    success: bool,
}

/// Thin client for the hosted mail endpoint. The relay fetches the attachment
/// from the given URL itself; only metadata crosses this wire.
pub struct MailRelayClient {
    client: reqwest::Client,
}

impl MailRelayClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for MailRelayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailRelay for MailRelayClient {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ExternalServiceError> {
        let url = required_env(TASKBILL_MAIL_RELAY_URL)?;

        let response = self
            .client
            .post(url)
            .json(&SendRequest {
                to: &email.to,
                subject: &email.subject,
                body: &email.body,
                attachment: &email.attachment_url,
            })
            .send()
            .await
            .map_err(|source| ExternalServiceError::Http {
                service: SERVICE,
                source,
            })?;

        if !response.status().is_success() {
            return Err(ExternalServiceError::from_response(SERVICE, response).await);
        }

        let body = response
            .json::<SendResponse>()
            .await
            .map_err(|err| ExternalServiceError::invalid(SERVICE, err.to_string()))?;
        if !body.success {
            return Err(ExternalServiceError::invalid(SERVICE, "relay reported failure"));
        }
        Ok(())
    }
}
