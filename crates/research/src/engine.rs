//! The research engine seam.
//!
//! The engine is an opaque long-running answer generator. Invocations may
//! take minutes; callers are responsible for running them off the request
//! path. There is no cancellation channel — a caller that loses interest
//! simply drops the result.

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use tansa_sessions::UserConfig;

use crate::error::{Error, Result};

/// Typed options handed to the engine, derived from a user's config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchOptions {
    pub max_search_queries: u32,
    pub enable_web_search: bool,
    pub report_format: String,
    pub language: String,
}

impl From<&UserConfig> for ResearchOptions {
    fn from(config: &UserConfig) -> Self {
        Self {
            max_search_queries: config.max_search_queries,
            enable_web_search: config.enable_web_search,
            report_format: config.report_format.as_str().to_string(),
            language: config.language.clone(),
        }
    }
}

/// A long-running answer generator.
#[async_trait]
pub trait ResearchEngine: Send + Sync {
    async fn invoke(&self, query: &str, options: &ResearchOptions) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ResearchAnswer {
    #[serde(default)]
    final_answer: Option<String>,
}

const FALLBACK_ANSWER: &str = "Unable to produce a research result.";

/// HTTP client for a researcher service exposing `POST /research`.
pub struct HttpResearchEngine {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpResearchEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/research", base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ResearchEngine for HttpResearchEngine {
    async fn invoke(&self, query: &str, options: &ResearchOptions) -> Result<String> {
        debug!(endpoint = %self.endpoint, "invoking researcher");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({"query": query, "options": options}))
            .send()
            .await
            .map_err(|e| Error::engine("request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EngineStatus {
                status: status.as_u16(),
                body,
            });
        }

        let answer: ResearchAnswer = response
            .json()
            .await
            .map_err(|e| Error::engine("invalid answer body", e))?;
        Ok(answer
            .final_answer
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, tansa_sessions::ReportFormat};

    #[test]
    fn options_mirror_user_config() {
        let config = UserConfig {
            max_search_queries: 5,
            enable_web_search: true,
            report_format: ReportFormat::Academic,
            ..UserConfig::default()
        };

        let options = ResearchOptions::from(&config);
        assert_eq!(options.max_search_queries, 5);
        assert!(options.enable_web_search);
        assert_eq!(options.report_format, "academic");
        assert_eq!(options.language, "zh-TW");
    }

    #[test]
    fn engine_endpoint_tolerates_trailing_slash() {
        let engine = HttpResearchEngine::new("http://127.0.0.1:2024/");
        assert_eq!(engine.endpoint, "http://127.0.0.1:2024/research");
    }
}
