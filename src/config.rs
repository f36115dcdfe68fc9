use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::quiz::ai_helper::{Credential, Engine, UnknownEngine};
use crate::workflow::MAX_PACING_SCALE;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const MAX_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PAGE_HOST: &str = "example.com";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{variable} has invalid value \"{value}\": {reason}")]
    Invalid {
        variable: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("CHATGPT_ENGINE: {0}")]
    Engine(#[from] UnknownEngine),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<Credential>,
    pub engine: Engine,
    pub api_url: Option<Url>,
    pub generation_timeout: Duration,
    pub pacing_scale: f64,
    pub page_host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            engine: Engine::default(),
            api_url: None,
            generation_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            pacing_scale: 1.0,
            page_host: DEFAULT_PAGE_HOST.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        config.api_key = get("CHATGPT_API_KEY").map(Credential::new);

        if let Some(value) = get("CHATGPT_ENGINE") {
            config.engine = value.parse()?;
        }

        if let Some(value) = get("CHATGPT_API_URL") {
            let api_url = value
                .parse::<Url>()
                .ok()
                .filter(|url| matches!(url.scheme(), "http" | "https"))
                .ok_or_else(|| ConfigError::Invalid {
                    variable: "CHATGPT_API_URL",
                    value: value.clone(),
                    reason: "expected an http(s) chat-completions URL",
                })?;
            config.api_url = Some(api_url);
        }

        if let Some(value) = get("GENERATION_TIMEOUT_SECS") {
            let secs = value
                .parse::<u64>()
                .ok()
                .filter(|secs| (1..=MAX_TIMEOUT_SECS).contains(secs))
                .ok_or_else(|| ConfigError::Invalid {
                    variable: "GENERATION_TIMEOUT_SECS",
                    value: value.clone(),
                    reason: "expected whole seconds between 1 and 120",
                })?;
            config.generation_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = get("WORKFLOW_PACING_SCALE") {
            config.pacing_scale = value
                .parse::<f64>()
                .ok()
                .filter(|scale| (0.0..=MAX_PACING_SCALE).contains(scale))
                .ok_or_else(|| ConfigError::Invalid {
                    variable: "WORKFLOW_PACING_SCALE",
                    value: value.clone(),
                    reason: "expected a number between 0 and 10",
                })?;
        }

        if let Some(value) = get("PAGE_PREVIEW_HOST") {
            config.page_host = value.trim_end_matches('/').to_string();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.engine, Engine::Gpt35Turbo);
        assert_eq!(config.generation_timeout, Duration::from_secs(20));
        assert_eq!(config.pacing_scale, 1.0);
        assert_eq!(config.page_host, "example.com");
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("CHATGPT_API_KEY", "sk-test"),
            ("CHATGPT_ENGINE", "gpt-4"),
            ("CHATGPT_API_URL", "http://localhost:8080/v1/chat/completions"),
            ("GENERATION_TIMEOUT_SECS", "30"),
            ("WORKFLOW_PACING_SCALE", "0"),
            ("PAGE_PREVIEW_HOST", "quizzes.example.org/"),
        ])
        .unwrap();

        assert_eq!(config.api_key.unwrap().secret(), "sk-test");
        assert_eq!(config.engine, Engine::Gpt4);
        assert_eq!(
            config.api_url.unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
        assert_eq!(config.pacing_scale, 0.0);
        assert_eq!(config.page_host, "quizzes.example.org");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = config_from(&[("CHATGPT_API_KEY", "   ")]).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn rejects_malformed_values() {
        let err = config_from(&[("GENERATION_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { variable: "GENERATION_TIMEOUT_SECS", .. }
        ));

        let err = config_from(&[("WORKFLOW_PACING_SCALE", "-1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { variable: "WORKFLOW_PACING_SCALE", .. }
        ));

        let err = config_from(&[("CHATGPT_API_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { variable: "CHATGPT_API_URL", .. }));
    }

    #[test]
    fn unknown_engine_names_the_value() {
        let err = config_from(&[("CHATGPT_ENGINE", "davinci")]).unwrap_err();
        assert_eq!(err, ConfigError::Engine(UnknownEngine("davinci".to_string())));
        assert!(err.to_string().contains("\"davinci\""));
    }

    #[test]
    fn pacing_scale_is_capped() {
        for value in ["1e20", "10.5", "inf", "NaN"] {
            let err = config_from(&[("WORKFLOW_PACING_SCALE", value)]).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid { variable: "WORKFLOW_PACING_SCALE", .. }
            ));
        }
        let config = config_from(&[("WORKFLOW_PACING_SCALE", "10")]).unwrap();
        assert_eq!(config.pacing_scale, 10.0);
    }
}
