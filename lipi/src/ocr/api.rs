use std::time::Duration;

use reqwest::{multipart, Client};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{LipiError, Result};

use super::engine::{EngineKind, Fragment};

pub const DEFAULT_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Recognition engine the service is asked to use.
const SERVICE_ENGINE: &str = "2";

const ENGINE: EngineKind = EngineKind::RemoteService;

/// Client for the OCR.space `parse/image` endpoint.
///
/// One attempt per call. Failures surface as `ExternalService` and the
/// caller decides whether to retry.
#[derive(Clone, Debug)]
pub struct OcrSpaceClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<ErrorMessage>,
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

/// The service sends either a single message or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn into_message(self) -> String {
        match self {
            ErrorMessage::One(msg) => msg,
            ErrorMessage::Many(msgs) => msgs.join("; "),
        }
    }
}

/// File part of the upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl OcrSpaceClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LipiError::unavailable(ENGINE, "API key required for OCR.space"))?;

        let endpoint = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                LipiError::unavailable(ENGINE, format!("Failed to create HTTP client: {e}"))
            })?;

        info!(endpoint = %endpoint, "OCR.space backend initialized");

        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn recognize(&self, upload: Upload, language: &str) -> Result<Vec<Fragment>> {
        let file_part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)
            .map_err(|e| LipiError::ocr(ENGINE, format!("Invalid MIME type: {e}")))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("language", language.to_string())
            .text("OCREngine", SERVICE_ENGINE)
            .text("detectOrientation", "true")
            .text("scale", "true");

        debug!(language, endpoint = %self.endpoint, "Sending image to OCR.space");

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LipiError::ExternalService(format!("OCR.space request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LipiError::ExternalService(format!(
                "OCR.space request failed: {status} - {body}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LipiError::ExternalService(format!("Failed to read response: {e}")))?;

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<Vec<Fragment>> {
    let parsed: ParseResponse = serde_json::from_str(body)
        .map_err(|e| LipiError::ocr(ENGINE, format!("Malformed response: {e}")))?;

    if parsed.is_errored_on_processing {
        let message = parsed
            .error_message
            .map(ErrorMessage::into_message)
            .unwrap_or_else(|| "OCR.space reported a processing error".to_string());
        return Err(LipiError::ExternalService(message));
    }

    Ok(parsed
        .parsed_results
        .and_then(|results| results.into_iter().next())
        .map(|first| vec![Fragment::new(first.parsed_text.trim())])
        .unwrap_or_default())
}
