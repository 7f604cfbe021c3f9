use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Placeholder origins of the WordPress front end. Override with
/// `BTA_ALLOWED_ORIGINS` in every real deployment.
const DEFAULT_ALLOWED_ORIGINS: &str =
    "https://YOUR-WP-DOMAIN-HERE.com,https://www.YOUR-WP-DOMAIN-HERE.com";

const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

/// Default request body limit (1MB).
const DEFAULT_MAX_BODY_BYTES: usize = 1_048_576;

#[derive(Debug, Clone)]
pub struct BtaConfig {
    pub common: core_config::Config,
    pub otlp_endpoint: Option<String>,
    pub cors: CorsConfig,
    pub openai: OpenAiSettings,
    pub generation_timeout: Duration,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Exact origins allowed to call the analysis endpoint.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// Absence is tolerated at startup and reported per request.
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: Option<u32>,
    pub force_tool_use: bool,
}

impl BtaConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(BtaConfig {
            common: common_config,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            cors: CorsConfig {
                allowed_origins: parse_origins(&get_env(
                    "BTA_ALLOWED_ORIGINS",
                    Some(DEFAULT_ALLOWED_ORIGINS),
                    is_prod,
                )?),
            },
            openai: OpenAiSettings {
                api_key: get_optional_env("OPENAI_API_KEY").map(Secret::new),
                base_url: get_env("OPENAI_BASE_URL", Some("https://api.openai.com/v1"), is_prod)?,
                model: get_env("OPENAI_MODEL", Some("gpt-5"), is_prod)?,
                max_output_tokens: get_optional_env("OPENAI_MAX_OUTPUT_TOKENS")
                    .map(|v| parse_number("OPENAI_MAX_OUTPUT_TOKENS", &v))
                    .transpose()?,
                force_tool_use: get_optional_env("OPENAI_FORCE_TOOL_USE")
                    .map(|v| parse_bool("OPENAI_FORCE_TOOL_USE", &v))
                    .transpose()?
                    .unwrap_or(true),
            },
            generation_timeout: Duration::from_secs(
                get_optional_env("GENERATION_TIMEOUT_SECS")
                    .map(|v| parse_number("GENERATION_TIMEOUT_SECS", &v))
                    .transpose()?
                    .unwrap_or(DEFAULT_GENERATION_TIMEOUT_SECS),
            ),
            max_body_bytes: get_optional_env("MAX_BODY_BYTES")
                .map(|v| parse_number("MAX_BODY_BYTES", &v))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        })
    }
}

/// Split a comma-separated origin list. Blank entries are dropped, as are
/// `*` and `null`, which would turn the allow-list into a wildcard.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter(|origin| {
            let wildcard = *origin == "*" || origin.eq_ignore_ascii_case("null");
            if wildcard {
                tracing::warn!(origin = %origin, "Ignoring non-exact entry in origin allow-list");
            }
            !wildcard
        })
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, value, e))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be a boolean, got '{}'",
            key,
            value
        ))),
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_exact() {
        assert_eq!(
            parse_origins(" https://a.example.com ,https://b.example.com,, "),
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }

    #[test]
    fn wildcard_entries_are_dropped() {
        assert_eq!(
            parse_origins("*,null,NULL,https://a.example.com"),
            vec!["https://a.example.com"]
        );
    }

    #[test]
    fn default_origins_parse() {
        assert_eq!(parse_origins(DEFAULT_ALLOWED_ORIGINS).len(), 2);
    }

    #[test]
    fn booleans_accept_common_spellings() {
        assert!(parse_bool("K", "TRUE").unwrap());
        assert!(!parse_bool("K", "off").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }

    #[test]
    fn numbers_report_the_offending_key() {
        assert_eq!(parse_number::<u64>("K", " 30 ").unwrap(), 30);

        let err = parse_number::<u32>("OPENAI_MAX_OUTPUT_TOKENS", "lots").unwrap_err();
        assert!(err.to_string().contains("OPENAI_MAX_OUTPUT_TOKENS"));
    }
}
