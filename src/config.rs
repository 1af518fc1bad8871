use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::client::{HttpClientOptions, HttpInferenceClient, DEFAULT_USER_AGENT};
use crate::detect::MissingFields;
use crate::labels::{LabelWriter, NumberFormat};
use crate::pipeline::AnnotateMode;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:9090/ai";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnnotatorConfigFile {
    server_url: Option<String>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
    always_reannotate: Option<bool>,
    missing_fields: Option<MissingFields>,
    number_format: Option<NumberFormat>,
}

#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    pub server_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub always_reannotate: bool,
    pub missing_fields: MissingFields,
    pub number_format: NumberFormat,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            always_reannotate: false,
            missing_fields: MissingFields::Zero,
            number_format: NumberFormat::Compact,
        }
    }
}

impl AnnotatorConfig {
    /// Defaults, then the file named by `ANNOTATOR_CONFIG`, then
    /// `ANNOTATOR_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ANNOTATOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnnotatorConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            server_url: file.server_url.unwrap_or(defaults.server_url),
            user_agent: file.user_agent.unwrap_or(defaults.user_agent),
            timeout: file.timeout_secs.map(Duration::from_secs),
            always_reannotate: file.always_reannotate.unwrap_or(defaults.always_reannotate),
            missing_fields: file.missing_fields.unwrap_or(defaults.missing_fields),
            number_format: file.number_format.unwrap_or(defaults.number_format),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("ANNOTATOR_SERVER_URL") {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
        if let Ok(timeout) = std::env::var("ANNOTATOR_TIMEOUT_SECS") {
            let seconds: u64 = timeout.trim().parse().map_err(|_| {
                anyhow!("ANNOTATOR_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.timeout = Some(Duration::from_secs(seconds));
        }
        if let Ok(always) = std::env::var("ANNOTATOR_ALWAYS_REANNOTATE") {
            self.always_reannotate = parse_bool(&always).ok_or_else(|| {
                anyhow!("ANNOTATOR_ALWAYS_REANNOTATE must be one of 1/0, true/false, yes/no, on/off")
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.server_url)
            .with_context(|| format!("invalid server_url '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "server_url must use http or https, got '{}'",
                url.scheme()
            ));
        }
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(anyhow!("timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn client_options(&self) -> HttpClientOptions {
        HttpClientOptions {
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
            missing_fields: self.missing_fields,
        }
    }

    pub fn build_client(&self) -> HttpInferenceClient {
        HttpInferenceClient::with_endpoint(&self.server_url, self.client_options())
    }

    pub fn label_writer(&self) -> LabelWriter {
        LabelWriter::new(self.number_format)
    }

    pub fn annotate_mode(&self) -> AnnotateMode {
        AnnotateMode::from_always(self.always_reannotate)
    }
}

fn read_config_file(path: &Path) -> Result<AnnotatorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AnnotatorConfig::from_file(AnnotatorConfigFile::default());
        assert_eq!(cfg.server_url, DEFAULT_SERVER_URL);
        assert_eq!(cfg.timeout, None);
        assert!(!cfg.always_reannotate);
        assert_eq!(cfg.annotate_mode(), AnnotateMode::IfMissing);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AnnotatorConfig {
            server_url: "ftp://host/ai".to_string(),
            ..AnnotatorConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.server_url = DEFAULT_SERVER_URL.to_string();
        cfg.timeout = Some(Duration::from_secs(0));
        assert!(cfg.validate().is_err());
    }
}
