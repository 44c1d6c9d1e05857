use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{GeneratedImage, GenerationRequest, GeneratorError, ImageFormat, ImageGenerator};
use crate::config::GeneratorConfig;

/// Client for an OpenAI-style `images/generations` endpoint.
///
/// Accepts either a JSON body with base64 images or a raw image body.
pub struct HttpImageGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    size: String,
}

#[derive(Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u8,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

impl HttpImageGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            size: config.size.clone(),
        })
    }
}

fn decode_json_body(body: &[u8]) -> Result<Option<Vec<u8>>, GeneratorError> {
    let parsed: ImagesResponse =
        serde_json::from_slice(body).map_err(|e| GeneratorError::Decode(e.to_string()))?;

    let Some(encoded) = parsed.data.into_iter().find_map(|d| d.b64_json) else {
        return Ok(None);
    };

    STANDARD
        .decode(encoded.trim())
        .map(Some)
        .map_err(|e| GeneratorError::Decode(format!("invalid base64 image: {e}")))
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    #[instrument(skip(self, request), fields(kind = %request.kind, label = %request.label))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<GeneratedImage>, GeneratorError> {
        let prompt = request.prompt();
        let body = ImagesRequest {
            model: &self.model,
            prompt: &prompt,
            size: &self.size,
            n: 1,
        };

        let mut http_request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let raw = response.bytes().await?;

        let bytes = match content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => Some(raw.to_vec()),
            _ => decode_json_body(&raw)?,
        };

        let Some(bytes) = bytes.filter(|b| !b.is_empty()) else {
            debug!("Generator returned no image");
            return Ok(None);
        };

        let format = ImageFormat::sniff(&bytes, content_type.as_deref())
            .ok_or(GeneratorError::UnsupportedFormat)?;

        Ok(Some(GeneratedImage { bytes, format }))
    }
}
