use async_trait::async_trait;
use thiserror::Error;

pub mod ai;
pub mod mail;
pub mod pdf;
pub mod storage;

pub use ai::OpenAiMarkupGenerator;
pub use mail::MailRelayClient;
pub use pdf::RemotePdfRenderer;
pub use storage::B2ObjectStore;

#[derive(Debug, Error)]
pub enum ExternalServiceError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} response invalid: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
}

impl ExternalServiceError {
    pub fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    pub(crate) async fn from_response(
        service: &'static str,
        response: reqwest::Response,
    ) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::Status {
            service,
            status,
            body: body.trim().chars().take(512).collect(),
        }
    }
}

pub(crate) fn required_env(name: &'static str) -> Result<String, ExternalServiceError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ExternalServiceError::MissingConfig(name))
}

pub(crate) fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Bounded parameter set handed to the markup generator and the local
/// template alike.
#[derive(Debug, Clone)]
pub struct InvoiceParams {
    pub invoice_id: String,
    pub project_name: String,
    pub project_description: String,
    pub task_name: String,
    pub client_name: String,
    pub client_email: String,
    pub freelancer_email: String,
    pub hourly_rate: f64,
    pub hours_worked: f64,
    pub due_date: Option<String>,
}

/// AI text service producing invoice markup from the bounded parameter set.
#[async_trait]
pub trait InvoiceMarkupGenerator: Send + Sync {
    async fn generate(&self, params: &InvoiceParams) -> Result<String, ExternalServiceError>;
}

/// HTML in, PDF bytes out.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, ExternalServiceError>;
}

/// Content store for rendered artifacts. Uploads are keyed by object name so
/// a retried upload for the same invoice overwrites rather than duplicates.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        object_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, ExternalServiceError>;

    /// Re-issues a time-limited authorized download URL for a stored object.
    async fn fresh_download_url(&self, object_name: &str)
        -> Result<String, ExternalServiceError>;
}

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment_url: String,
}

/// Mail relay: deliver or fail, nothing else assumed.
#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ExternalServiceError>;
}
