use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ted: TedConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TedConfig {
    /// Hostname or IP address of the TED ECC
    #[serde(default)]
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    80
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Percentage into the circuit list at which rows start fading out
    #[serde(default)]
    pub fade_start_percent: Option<f64>,
    /// Peak output of the generation system in watts; enables `solar-now`
    #[serde(default)]
    pub solar_max_watts: Option<i64>,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default)]
    pub debug: bool,
}

fn default_refresh_interval_secs() -> u64 {
    10
}

fn default_output_dir() -> String {
    ".".into()
}

fn default_currency_symbol() -> String {
    "$".into()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            output_dir: default_output_dir(),
            fade_start_percent: None,
            solar_max_watts: None,
            currency_symbol: default_currency_symbol(),
            debug: false,
        }
    }
}

/// Settings handed to the monitor core once the configuration is validated.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub hostname: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub refresh_interval: Duration,
    pub output_dir: PathBuf,
    /// Fraction in `[0, 1]`; `None` disables fading
    pub fade_point: Option<f64>,
    pub solar_max_watts: Option<i64>,
    pub currency_symbol: String,
    pub debug: bool,
}

impl Config {
    /// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
    /// Afterwards, if TED_HOSTNAME env is set, override `ted.hostname`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let expanded = expand_env_placeholders(&raw)?;
        let mut cfg: Self = serde_yaml::from_str(&expanded)?;

        if let Ok(hostname) = std::env::var("TED_HOSTNAME") {
            cfg.ted.hostname = hostname;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.ted.hostname.trim().is_empty() {
            return Err(AppError::Config(
                "ted.hostname is required".to_string(),
            ));
        }

        if self.monitor.refresh_interval_secs == 0 {
            return Err(AppError::Config(
                "monitor.refresh_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            hostname: self.ted.hostname.trim().to_string(),
            port: self.ted.port,
            request_timeout: Duration::from_secs(self.ted.timeout_secs),
            refresh_interval: Duration::from_secs(self.monitor.refresh_interval_secs),
            output_dir: PathBuf::from(&self.monitor.output_dir),
            fade_point: self
                .monitor
                .fade_start_percent
                .filter(|p| p.is_finite())
                .map(|p| p.clamp(0.0, 100.0) / 100.0),
            solar_max_watts: self.monitor.solar_max_watts.filter(|w| *w > 0),
            currency_symbol: self.monitor.currency_symbol.clone(),
            debug: self.monitor.debug,
        }
    }
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// "$$" becomes a literal "$" (escape).
fn expand_env_placeholders(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut it = input.chars().peekable();

    while let Some(c) = it.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let close = match it.peek().copied() {
            Some('$') => {
                it.next();
                out.push('$');
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                continue;
            }
        };
        it.next();
        let var = read_until(&mut it, close).ok_or_else(|| {
            AppError::Config(format!(
                "unterminated env placeholder: missing '{}'",
                close
            ))
        })?;
        let val = std::env::var(&var)
            .map_err(|_| AppError::Config(format!("missing environment variable: {}", var)))?;
        out.push_str(&val);
    }

    Ok(out)
}

/// Read characters until we hit `end`, returning the collected string.
/// Consumes the closing delimiter.
fn read_until<I>(it: &mut std::iter::Peekable<I>, end: char) -> Option<String>
where
    I: Iterator<Item = char>,
{
    let mut buf = String::new();
    for ch in it.by_ref() {
        if ch == end {
            return Some(buf);
        }
        buf.push(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_env_placeholders() {
        std::env::set_var("TED_TEST_HOST", "ted.lan");

        let output = expand_env_placeholders("hostname: $(TED_TEST_HOST) / ${TED_TEST_HOST} $$5").unwrap();
        assert_eq!(output, "hostname: ted.lan / ted.lan $5");

        std::env::remove_var("TED_TEST_HOST");
    }

    #[test]
    #[serial]
    fn test_expand_env_placeholders_missing_var() {
        std::env::remove_var("TED_TEST_MISSING");
        let err = expand_env_placeholders("hostname: $(TED_TEST_MISSING)").unwrap_err();
        assert!(err.to_string().contains("TED_TEST_MISSING"));
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert!(expand_env_placeholders("hostname: ${TED").is_err());
    }

    #[test]
    fn test_monitor_settings_clamps_fade_and_drops_zero_solar() {
        let cfg = Config {
            ted: TedConfig {
                hostname: " ted.lan ".into(),
                port: 8080,
                timeout_secs: 5,
            },
            monitor: MonitorConfig {
                fade_start_percent: Some(150.0),
                solar_max_watts: Some(0),
                ..Default::default()
            },
        };

        let settings = cfg.monitor_settings();
        assert_eq!(settings.hostname, "ted.lan");
        assert_eq!(settings.fade_point, Some(1.0));
        assert_eq!(settings.solar_max_watts, None);
        assert_eq!(settings.refresh_interval, Duration::from_secs(10));
        assert_eq!(settings.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_validate_rejects_empty_hostname() {
        let cfg = Config {
            ted: TedConfig {
                hostname: "  ".into(),
                port: 80,
                timeout_secs: 10,
            },
            monitor: MonitorConfig::default(),
        };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }
}
