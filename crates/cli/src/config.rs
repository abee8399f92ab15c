//! Instance configuration loaded from a YAML file.
//!
//! `port`, `metrics`, and `debug` are accepted either as YAML scalars or as
//! strings (`"8080"`, `"true"`), since some provisioning tools quote every
//! value they write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

/// Default drain period for in-flight dispatch units on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Console log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Validated bridge configuration.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub host: String,
    pub port: u16,
    pub metrics: bool,
    pub debug: bool,
    pub dump_dir: PathBuf,
    /// Raw `project → url` entries. Normalization happens in `RouteTable::from_hooks`.
    pub hooks: BTreeMap<String, String>,
    pub mm_user: String,
    pub mm_icon: String,
    /// Accepted for compatibility. Profiling is not supported.
    pub profile: Option<String>,
    pub delivery_timeout: Option<Duration>,
    pub shutdown_grace: Duration,
    pub otlp_endpoint: Option<String>,
    pub log_format: LogFormat,
}

/// A YAML value that may have been written quoted or unquoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    host: String,
    port: Option<Scalar>,
    metrics: Option<Scalar>,
    debug: Option<Scalar>,
    #[serde(default)]
    hooks: BTreeMap<String, String>,
    dumpdir: Option<PathBuf>,
    #[serde(default)]
    mmuser: String,
    #[serde(default)]
    mmicon: String,
    profile: Option<String>,
    delivery_timeout_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
    otlp_endpoint: Option<String>,
    #[serde(default)]
    log_format: LogFormat,
}

impl InstanceConfig {
    /// Reads and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses and validates configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(text).context("malformed YAML")?;

        let host = raw.host.trim().to_string();
        if host.is_empty() {
            bail!("`host` must not be empty");
        }
        let port = match raw.port {
            Some(value) => parse_port(value)?,
            None => bail!("`port` is required"),
        };
        let metrics = raw.metrics.map(|v| parse_bool("metrics", v)).transpose()?;
        let debug = raw.debug.map(|v| parse_bool("debug", v)).transpose()?;

        Ok(Self {
            host,
            port,
            metrics: metrics.unwrap_or(true),
            debug: debug.unwrap_or(false),
            dump_dir: raw
                .dumpdir
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(std::env::temp_dir),
            hooks: raw.hooks,
            mm_user: raw.mmuser,
            mm_icon: raw.mmicon,
            profile: raw.profile.filter(|p| !p.trim().is_empty()),
            delivery_timeout: raw
                .delivery_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            shutdown_grace: raw
                .shutdown_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE),
            otlp_endpoint: raw.otlp_endpoint.filter(|e| !e.trim().is_empty()),
            log_format: raw.log_format,
        })
    }
}

fn parse_port(value: Scalar) -> Result<u16> {
    let port = match value {
        Scalar::Int(n) => u16::try_from(n).ok(),
        Scalar::Str(s) => s.trim().parse::<u16>().ok(),
        Scalar::Bool(_) => None,
    };
    port.ok_or_else(|| anyhow!("invalid `port`"))
}

/// Accepts the spellings `1 t T TRUE true True 0 f F FALSE false False`.
fn parse_bool(field: &str, value: Scalar) -> Result<bool> {
    let parsed = match value {
        Scalar::Bool(b) => Some(b),
        Scalar::Int(1) => Some(true),
        Scalar::Int(0) => Some(false),
        Scalar::Int(_) => None,
        Scalar::Str(s) => match s.trim() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        },
    };
    parsed.ok_or_else(|| anyhow!("invalid `{field}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
host: 0.0.0.0
port: "8080"
metrics: "true"
debug: "false"
dumpdir: /var/tmp/mmjira
mmuser: jira-bot
mmicon: https://icons.example/jira.png
hooks:
  ABC: https://mm.example/hooks/abc
  xyz: https://mm.example/hooks/xyz
"#;

    #[test]
    fn quoted_scalars_are_accepted() {
        let config = InstanceConfig::from_yaml(FULL).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.metrics);
        assert!(!config.debug);
        assert_eq!(config.dump_dir, PathBuf::from("/var/tmp/mmjira"));
        assert_eq!(config.mm_user, "jira-bot");
        assert_eq!(config.mm_icon, "https://icons.example/jira.png");
        assert_eq!(config.hooks.len(), 2);
        assert_eq!(config.hooks["ABC"], "https://mm.example/hooks/abc");
    }

    #[test]
    fn unquoted_scalars_are_accepted() {
        let config =
            InstanceConfig::from_yaml("host: localhost\nport: 9000\nmetrics: false\ndebug: 1\n")
                .unwrap();

        assert_eq!(config.port, 9000);
        assert!(!config.metrics);
        assert!(config.debug);
    }

    #[test]
    fn defaults_apply_to_optional_keys() {
        let config = InstanceConfig::from_yaml("host: localhost\nport: 8080\n").unwrap();

        assert!(config.metrics);
        assert!(!config.debug);
        assert_eq!(config.dump_dir, std::env::temp_dir());
        assert!(config.hooks.is_empty());
        assert_eq!(config.delivery_timeout, None);
        assert_eq!(config.shutdown_grace, DEFAULT_SHUTDOWN_GRACE);
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn supplementary_keys_are_read() {
        let config = InstanceConfig::from_yaml(
            "host: localhost\nport: 8080\ndelivery_timeout_secs: 5\nshutdown_grace_secs: 2\notlp_endpoint: http://collector:4317\nlog_format: json\n",
        )
        .unwrap();

        assert_eq!(config.delivery_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.shutdown_grace, Duration::from_secs(2));
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn empty_host_is_rejected() {
        let err = InstanceConfig::from_yaml("host: ''\nport: 8080\n").unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn missing_or_invalid_port_is_rejected() {
        assert!(InstanceConfig::from_yaml("host: localhost\n").is_err());
        assert!(InstanceConfig::from_yaml("host: localhost\nport: http\n").is_err());
        assert!(InstanceConfig::from_yaml("host: localhost\nport: 70000\n").is_err());
    }

    #[test]
    fn invalid_boolean_is_rejected() {
        let err = InstanceConfig::from_yaml("host: localhost\nport: 8080\nmetrics: yes-please\n")
            .unwrap_err();
        assert!(err.to_string().contains("metrics"));
    }

    #[test]
    fn profile_is_kept_for_the_startup_warning() {
        let config =
            InstanceConfig::from_yaml("host: localhost\nport: 8080\nprofile: cpu\nprofiledir: /tmp\n")
                .unwrap();
        assert_eq!(config.profile.as_deref(), Some("cpu"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, FULL).unwrap();

        let config = InstanceConfig::load(&path).unwrap();
        assert_eq!(config.port, 8080);

        let missing = InstanceConfig::load(&dir.path().join("absent.yaml"));
        assert!(missing.is_err());
    }
}
