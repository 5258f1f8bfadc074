//! Blocking HTTP implementation of [`ExtractionService`].

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{EntityResult, ExtractionResult};
use super::ExtractionService;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;

/// Maximum length of an error body kept for logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_error_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

#[derive(Serialize)]
struct EntityRequest<'a> {
    text: &'a str,
}

pub struct HttpExtractionService {
    client: Client,
    document_extract_url: String,
    entity_extract_url: String,
    api_key: SecretString,
}

impl HttpExtractionService {
    pub fn new(config: &ExtractionConfig, api_key: SecretString) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ExtractionError::Client(e.to_string()))?;

        Ok(Self {
            client,
            document_extract_url: config.document_extract_url.clone(),
            entity_extract_url: config.entity_extract_url.clone(),
            api_key,
        })
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ExtractionError> {
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ExtractionError::MalformedBody(e.to_string()))
    }
}

impl ExtractionService for HttpExtractionService {
    fn extract_document(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())
            .map_err(|e| ExtractionError::Client(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.document_extract_url)
            .bearer_auth(self.api_key.expose_secret())
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        Self::decode(response)
    }

    fn extract_entities(
        &self,
        document: &ExtractionResult,
    ) -> Result<EntityResult, ExtractionError> {
        let response = self
            .client
            .post(&self.entity_extract_url)
            .bearer_auth(self.api_key.expose_secret())
            .header(ACCEPT, "application/json")
            .json(&EntityRequest {
                text: &document.extracted_text,
            })
            .send()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        Self::decode(response)
    }
}
