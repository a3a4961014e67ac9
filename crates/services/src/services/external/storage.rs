use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use super::{ExternalServiceError, ObjectStore, required_env};

const SERVICE: &str = "object-store";

const TASKBILL_STORE_KEY_ID: &str = "TASKBILL_STORE_KEY_ID";
const TASKBILL_STORE_APP_KEY: &str = "TASKBILL_STORE_APP_KEY";
const TASKBILL_STORE_BUCKET_ID: &str = "TASKBILL_STORE_BUCKET_ID";
const TASKBILL_STORE_BUCKET_NAME: &str = "TASKBILL_STORE_BUCKET_NAME";

const AUTHORIZE_URL: &str = "https://api.backblazeb2.com/b2api/v2/b2_authorize_account";

/// Issued download links stay valid this long.
const DOWNLOAD_AUTH_SECONDS: u32 = 3600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    authorization_token: String,
    api_url: String,
    download_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlRequest<'a> {
    bucket_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlResponse {
    upload_url: String,
    authorization_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadAuthRequest<'a> {
    bucket_id: &'a str,
    file_name_prefix: &'a str,
    valid_duration_in_seconds: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadAuthResponse {
    authorization_token: String,
}

struct StoreConfig {
    key_id: String,
    app_key: String,
    bucket_id: String,
    bucket_name: String,
}

fn resolve_config() -> Result<StoreConfig, ExternalServiceError> {
    Ok(StoreConfig {
        key_id: required_env(TASKBILL_STORE_KEY_ID)?,
        app_key: required_env(TASKBILL_STORE_APP_KEY)?,
        bucket_id: required_env(TASKBILL_STORE_BUCKET_ID)?,
        bucket_name: required_env(TASKBILL_STORE_BUCKET_NAME)?,
    })
}

/// B2-style bucket client. Every operation re-authorizes the account first;
/// the auth token is short-lived and the call volume here is tiny.
pub struct B2ObjectStore {
    client: reqwest::Client,
}

impl B2ObjectStore {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn authorize(
        &self,
        config: &StoreConfig,
    ) -> Result<AuthorizeAccountResponse, ExternalServiceError> {
        let response = self
            .client
            .get(AUTHORIZE_URL)
            .basic_auth(&config.key_id, Some(&config.app_key))
            .send()
            .await
            .map_err(|source| ExternalServiceError::Http {
                service: SERVICE,
                source,
            })?;

        if !response.status().is_success() {
            return Err(ExternalServiceError::from_response(SERVICE, response).await);
        }
        response
            .json::<AuthorizeAccountResponse>()
            .await
            .map_err(|err| ExternalServiceError::invalid(SERVICE, err.to_string()))
    }
}

impl Default for B2ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for B2ObjectStore {
    async fn upload(
        &self,
        object_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, ExternalServiceError> {
        let config = resolve_config()?;
        let auth = self.authorize(&config).await?;

        let upload_target = self
            .client
            .post(format!("{}/b2api/v2/b2_get_upload_url", auth.api_url))
            .header("Authorization", &auth.authorization_token)
            .json(&GetUploadUrlRequest {
                bucket_id: &config.bucket_id,
            })
            .send()
            .await
            .map_err(|source| ExternalServiceError::Http {
                service: SERVICE,
                source,
            })?;

        if !upload_target.status().is_success() {
            return Err(ExternalServiceError::from_response(SERVICE, upload_target).await);
        }
        let upload_target = upload_target
            .json::<GetUploadUrlResponse>()
            .await
            .map_err(|err| ExternalServiceError::invalid(SERVICE, err.to_string()))?;

        let sha1_hex = hex_sha1(bytes);
        let response = self
            .client
            .post(&upload_target.upload_url)
            .header("Authorization", &upload_target.authorization_token)
            .header("X-Bz-File-Name", object_name)
            .header("Content-Type", content_type)
            .header("X-Bz-Content-Sha1", sha1_hex)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|source| ExternalServiceError::Http {
                service: SERVICE,
                source,
            })?;

        if !response.status().is_success() {
            return Err(ExternalServiceError::from_response(SERVICE, response).await);
        }

        Ok(format!(
            "{}/file/{}/{}",
            auth.download_url, config.bucket_name, object_name
        ))
    }

    async fn fresh_download_url(
        &self,
        object_name: &str,
    ) -> Result<String, ExternalServiceError> {
        let config = resolve_config()?;
        let auth = self.authorize(&config).await?;

        let response = self
            .client
            .post(format!(
                "{}/b2api/v2/b2_get_download_authorization",
                auth.api_url
            ))
            .header("Authorization", &auth.authorization_token)
            .json(&DownloadAuthRequest {
                bucket_id: &config.bucket_id,
                file_name_prefix: object_name,
                valid_duration_in_seconds: DOWNLOAD_AUTH_SECONDS,
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
        let download_auth = response
            .json::<DownloadAuthResponse>()
            .await
            .map_err(|err| ExternalServiceError::invalid(SERVICE, err.to_string()))?;

        Ok(format!(
            "{}/file/{}/{}?Authorization={}",
            auth.download_url, config.bucket_name, object_name, download_auth.authorization_token
        ))
    }
}

fn hex_sha1(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::hex_sha1;

    #[test]
    fn hex_sha1_matches_known_digest() {
        assert_eq!(
            hex_sha1(b"hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }
}
