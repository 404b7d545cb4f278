use std::env;

use eyre::{Result, eyre};
use serde::Deserialize;
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Generation method a model must support to be usable for chat.
pub const CHAT_METHOD: &str = "generateContent";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_chat(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == CHAT_METHOD)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPage {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| eyre!("GEMINI_API_KEY environment variable not set"))?;

        Ok(Self::with_base_url(api_key, DEFAULT_BASE_URL))
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// The key with everything past the first five characters hidden.
    pub fn masked_key(&self) -> String {
        let prefix: String = self.api_key.chars().take(5).collect();
        format!("{}...*****", prefix)
    }

    /// Every model the key can reach that supports chat generation,
    /// following pagination to the end.
    pub async fn list_chat_models(&self) -> Result<Vec<ModelInfo>> {
        let api_url = format!("{}/v1beta/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&api_url).query(&[("key", self.api_key.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await?;
                error!(%status, "Model listing failed with response: {}", error_text);
                return Err(eyre!("Model listing failed ({}): {}", status, error_text));
            }

            let page: ModelPage = response.json().await?;
            debug!(count = page.models.len(), "Received model page");

            models.extend(page.models.into_iter().filter(ModelInfo::supports_chat));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(models)
    }
}
