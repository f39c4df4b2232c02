//! Image payloads handed to a provider alongside the analysis prompt.

use std::path::Path;

use base64::Engine;

/// Detail hint passed through to the provider; providers that don't
/// support a per-image hint (Claude, Gemini) simply ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDetail {
    Low,
    High,
    Auto,
}

impl ImageDetail {
    fn as_str(self) -> &'static str {
        match self {
            ImageDetail::Low => "low",
            ImageDetail::High => "high",
            ImageDetail::Auto => "auto",
        }
    }
}

/// A single base64-encoded JPEG ready to embed in a provider request.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub data: String,
    pub detail: ImageDetail,
}

impl ImagePayload {
    pub fn new(data: impl Into<String>, detail: ImageDetail) -> Self {
        Self {
            data: data.into(),
            detail,
        }
    }

    pub async fn from_file(path: impl AsRef<Path>, detail: ImageDetail) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(base64::engine::general_purpose::STANDARD.encode(bytes), detail))
    }

    /// OpenAI's `image_url` content-part shape.
    pub fn to_openai_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "image_url",
            "image_url": {
                "url": format!("data:image/jpeg;base64,{}", self.data),
                "detail": self.detail.as_str(),
            }
        })
    }

    /// Claude's `image` content-block shape.
    pub fn to_claude_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": "image/jpeg",
                "data": self.data,
            }
        })
    }

    /// Gemini's `inlineData` part shape.
    pub fn to_gemini_json(&self) -> serde_json::Value {
        serde_json::json!({
            "inlineData": {
                "mimeType": "image/jpeg",
                "data": self.data,
            }
        })
    }
}
