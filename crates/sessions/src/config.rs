//! Per-user tunables, independent of session lifetime.

use serde::{Deserialize, Serialize};

/// Shape of the generated research report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Standard,
    Academic,
    Concise,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Self::Standard),
            "academic" => Some(Self::Academic),
            "concise" => Some(Self::Concise),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Academic => "academic",
            Self::Concise => "concise",
        }
    }
}

/// Per-user configuration, created with defaults on first access and fully
/// replaceable through postback controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// How many search queries the researcher may fan out per request.
    pub max_search_queries: u32,
    pub enable_web_search: bool,
    pub report_format: ReportFormat,
    /// BCP 47 tag for generated reports.
    pub language: String,
    pub notifications_enabled: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            max_search_queries: 3,
            enable_web_search: false,
            report_format: ReportFormat::Standard,
            language: "zh-TW".into(),
            notifications_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = UserConfig::default();
        assert_eq!(config.max_search_queries, 3);
        assert!(!config.enable_web_search);
        assert_eq!(config.report_format, ReportFormat::Standard);
        assert_eq!(config.language, "zh-TW");
        assert!(config.notifications_enabled);
    }

    #[test]
    fn report_format_parse_round_trip() {
        for format in [
            ReportFormat::Standard,
            ReportFormat::Academic,
            ReportFormat::Concise,
        ] {
            assert_eq!(ReportFormat::parse(format.as_str()), Some(format));
        }
        assert_eq!(ReportFormat::parse("tabloid"), None);
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: UserConfig = serde_json::from_str(r#"{"max_search_queries": 7}"#).unwrap();
        assert_eq!(config.max_search_queries, 7);
        assert_eq!(config.report_format, ReportFormat::Standard);
        assert_eq!(config.language, "zh-TW");
    }
}
