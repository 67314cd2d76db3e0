use serde::{Deserialize, Serialize};

/// LLM backend the analysis server uses for report generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Openai,
}

/// Settings as reported by the backend.  Keys come back masked; an empty
/// string means the key is not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    pub llm_provider: LlmProvider,
    pub gemini_api_key_masked: String,
    pub openai_api_key_masked: String,
    pub tavily_api_key_masked: String,
}

/// Settings write.  Keys left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub llm_provider: LlmProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,
}

impl SettingsData {
    /// Whether the key required by the selected provider is present.
    pub fn provider_key_configured(&self) -> bool {
        match self.llm_provider {
            LlmProvider::Gemini => !self.gemini_api_key_masked.is_empty(),
            LlmProvider::Openai => !self.openai_api_key_masked.is_empty(),
        }
    }

    /// Web search is optional for generation but degrades report quality.
    pub fn search_key_configured(&self) -> bool {
        !self.tavily_api_key_masked.is_empty()
    }
}

impl SettingsUpdate {
    /// Keep the provider and only send keys that were actually typed in;
    /// blank inputs must not wipe stored keys.
    pub fn new(
        llm_provider: LlmProvider,
        gemini_api_key: &str,
        openai_api_key: &str,
        tavily_api_key: &str,
    ) -> Self {
        let non_blank = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Self {
            llm_provider,
            gemini_api_key: non_blank(gemini_api_key),
            openai_api_key: non_blank(openai_api_key),
            tavily_api_key: non_blank(tavily_api_key),
        }
    }
}
