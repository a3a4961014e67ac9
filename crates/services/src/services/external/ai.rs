use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    ExternalServiceError, InvoiceMarkupGenerator, InvoiceParams, env_or, required_env,
};

const SERVICE: &str = "ai-generator";

const TASKBILL_AI_API_BASE: &str = "TASKBILL_AI_API_BASE";
const TASKBILL_AI_API_KEY: &str = "TASKBILL_AI_API_KEY";
const TASKBILL_AI_MODEL: &str = "TASKBILL_AI_MODEL";

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Hard ceiling on a single generation call. The caller falls back to the
/// local template when this elapses, so a slow provider can only ever cost
/// the user this much wall time.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiMessageResponse>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessageResponse {
    content: Option<String>,
}

/// OpenAI-compatible chat client that turns a bounded invoice parameter set
/// into standalone invoice HTML.
pub struct OpenAiMarkupGenerator {
    client: reqwest::Client,
}

impl OpenAiMarkupGenerator {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for OpenAiMarkupGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvoiceMarkupGenerator for OpenAiMarkupGenerator {
    async fn generate(&self, params: &InvoiceParams) -> Result<String, ExternalServiceError> {
        let base_url = required_env(TASKBILL_AI_API_BASE)?;
        let api_key = required_env(TASKBILL_AI_API_KEY)?;
        let model = env_or(TASKBILL_AI_MODEL, DEFAULT_MODEL);

        let request_body = OpenAiChatRequest {
            model,
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: system_prompt(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: user_prompt(params),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(chat_completions_url(&base_url))
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|source| ExternalServiceError::Http {
                service: SERVICE,
                source,
            })?;

        if !response.status().is_success() {
            return Err(ExternalServiceError::from_response(SERVICE, response).await);
        }

        let data = response
            .json::<OpenAiChatResponse>()
            .await
            .map_err(|err| ExternalServiceError::invalid(SERVICE, err.to_string()))?;

        data.choices
            .iter()
            .find_map(|choice| choice.message.as_ref()?.content.as_ref())
            .map(|text| strip_markdown_fence(text))
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ExternalServiceError::invalid(SERVICE, "empty completion"))
    }
}

fn chat_completions_url(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        format!("{}/chat/completions", trimmed)
    } else {
        format!("{}/v1/chat/completions", trimmed)
    }
}

fn system_prompt() -> String {
    "You are an invoice formatter. Produce a complete, self-contained HTML document \
for the invoice described by the user. Use inline CSS only, no external assets and \
no scripts. Return only the HTML with no commentary."
        .to_string()
}

fn user_prompt(params: &InvoiceParams) -> String {
    let total = params.hours_worked * params.hourly_rate;
    format!(
        "Invoice number: {id}\n\
Project: {project}\n\
Project description: {description}\n\
Task: {task}\n\
Bill to: {client} <{client_email}>\n\
From: {freelancer}\n\
Hours worked: {hours:.2}\n\
Hourly rate: ${rate:.2}\n\
Total due: ${total:.2}\n\
Due date: {due}",
        id = params.invoice_id,
        project = params.project_name,
        description = params.project_description,
        task = params.task_name,
        client = params.client_name,
        client_email = params.client_email,
        freelancer = params.freelancer_email,
        hours = params.hours_worked,
        rate = params.hourly_rate,
        total = total,
        due = params.due_date.as_deref().unwrap_or("on receipt"),
    )
}

/// Models often wrap HTML in a ```html fence despite instructions.
fn strip_markdown_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_prefix("html").unwrap_or(rest).trim();
    rest.strip_suffix("```").unwrap_or(rest).trim().to_string()
}
