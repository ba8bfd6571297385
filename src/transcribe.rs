//! Audio transcription helper for the voice front-end.
//!
//! Not part of the bridge: the CLI transcribes a recording to text and
//! then feeds the text through `process_message` like any typed input.

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::Engine;
use serde_json::json;
use tracing::debug;

use crate::config::LlmConfig;

/// The endpoint rejects larger payloads; checked on the encoded size.
const MAX_ENCODED_BYTES: usize = 1_800_000;

/// Transcribe an audio file via the multimodal completion endpoint.
pub async fn audio_to_text(path: &Path, config: &LlmConfig, api_key: &str) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read audio file: {}", path.display()))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    if encoded.len() >= MAX_ENCODED_BYTES {
        bail!(
            "audio file too large: {} bytes encoded (limit {})",
            encoded.len(),
            MAX_ENCODED_BYTES
        );
    }

    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
    debug!(url = %url, bytes = bytes.len(), "transcription request");

    let payload = json!({
        "model": config.transcription_model,
        "messages": [{
            "role": "user",
            "content": format!(
                "Transcribe the spoken content.<audio src=\"data:audio/wav;base64,{}\" />",
                encoded
            )
        }],
        "max_tokens": 512,
        "temperature": 0.10,
        "top_p": 0.70,
        "stream": false
    });

    let response = reqwest::Client::new()
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Accept", "application/json")
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("Failed to send transcription request to {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("transcription endpoint returned {}: {}", status, body);
    }

    let body: serde_json::Value = response
        .json()
        .await
        .context("Failed to parse transcription response")?;

    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .with_context(|| format!("No transcription text in response: {}", body))
}
