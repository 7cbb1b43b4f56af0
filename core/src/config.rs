//! Client configuration.
//!
//! A `Config` is plain data: it can be deserialized from a caller's own
//! configuration file (every field has a default) or read from `NSONE_*`
//! environment variables.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://api.nsone.net/v1/";
pub const DEFAULT_USER_AGENT: &str = concat!("nsone-rs/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL every request path is resolved against.
    pub endpoint: String,
    pub api_key: String,
    pub user_agent: String,
    /// Walk `Link: rel="next"` headers by default.
    pub follow_pagination: bool,
    /// Talk to a DDI deployment, which uses alternate payload shapes for some
    /// resources.
    pub ddi: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_pagination: true,
            ddi: false,
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<secret>")
            .field("user_agent", &self.user_agent)
            .field("follow_pagination", &self.follow_pagination)
            .field("ddi", &self.ddi)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Read `NSONE_API_KEY`, `NSONE_ENDPOINT`, `NSONE_USER_AGENT`,
    /// `NSONE_FOLLOW_PAGINATION`, `NSONE_DDI` and `NSONE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`. Unset or
    /// unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(v) = lookup("NSONE_API_KEY") {
            config.api_key = v;
        }
        if let Some(v) = lookup("NSONE_ENDPOINT") {
            config.endpoint = v;
        }
        if let Some(v) = lookup("NSONE_USER_AGENT") {
            config.user_agent = v;
        }
        if let Some(v) = lookup("NSONE_FOLLOW_PAGINATION").and_then(|v| parse_bool(&v)) {
            config.follow_pagination = v;
        }
        if let Some(v) = lookup("NSONE_DDI").and_then(|v| parse_bool(&v)) {
            config.ddi = v;
        }
        if let Some(v) = lookup("NSONE_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            config.timeout_secs = Some(v);
        }
        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.follow_pagination);
        assert!(!config.ddi);
        assert!(config.user_agent.starts_with("nsone-rs/"));
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("NSONE_API_KEY", "abc"),
            ("NSONE_ENDPOINT", "http://localhost:8080/v1/"),
            ("NSONE_FOLLOW_PAGINATION", "false"),
            ("NSONE_DDI", "1"),
            ("NSONE_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.endpoint, "http://localhost:8080/v1/");
        assert!(!config.follow_pagination);
        assert!(config.ddi);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn unparsable_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("NSONE_FOLLOW_PAGINATION", "maybe"),
            ("NSONE_TIMEOUT_SECS", "soon"),
        ]));
        assert!(config.follow_pagination);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn deserializes_partial_json() {
        let config: Config = serde_json::from_str(r#"{"api_key":"k","ddi":true}"#).unwrap();
        assert_eq!(config.api_key, "k");
        assert!(config.ddi);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", Config::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<secret>"));
    }
}
