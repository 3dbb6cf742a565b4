use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::duration::{ensure_within_limit, parse_duration, serde_duration};
use crate::utils::format_duration;
use crate::{PrloadError, Result};

/// 一个阶段：在 `duration` 内把并发 VU 数线性调整到 `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Stage {
    #[serde(with = "serde_duration")]
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    pub fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

/// CLI 写法 `20s:10`
impl FromStr for Stage {
    type Err = PrloadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (duration, target) = s.split_once(':').ok_or_else(|| {
            PrloadError::ConfigError(format!("stage must look like DURATION:TARGET, got '{}'", s))
        })?;
        let target = target.trim().parse::<u64>().map_err(|_| {
            PrloadError::ConfigError(format!("invalid stage target '{}'", target.trim()))
        })?;
        Ok(Stage::new(parse_duration(duration)?, target))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", format_duration(self.duration), self.target)
    }
}

/// 一次压测运行的完整配置
///
/// 启动时加载一次，之后只读。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub base_url: String,
    pub start_vus: u64,
    pub stages: Vec<Stage>,
    #[serde(with = "serde_duration")]
    pub pacing: Duration,
    #[serde(with = "serde_duration")]
    pub graceful_ramp_down: Duration,
    #[serde(with = "serde_duration")]
    pub graceful_stop: Duration,
    #[serde(with = "serde_duration")]
    pub request_timeout: Duration,
    #[serde(with = "serde_duration")]
    pub tick: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            start_vus: 1,
            stages: vec![
                Stage::new(Duration::from_secs(20), 10),
                Stage::new(Duration::from_secs(40), 30),
                Stage::new(Duration::from_secs(20), 0),
            ],
            pacing: Duration::from_millis(200),
            graceful_ramp_down: Duration::from_secs(30),
            graceful_stop: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            tick: Duration::from_millis(100),
        }
    }
}

impl LoadConfig {
    /// 所有阶段时长之和，溢出时取 `Duration::MAX`
    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |total, s| total.saturating_add(s.duration))
    }

    /// 解析并校验 base URL
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(self.base_url.trim())
            .map_err(|e| PrloadError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(PrloadError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                self.base_url
            )));
        }
        if url.host_str().is_none() {
            return Err(PrloadError::InvalidUrl(format!(
                "missing host in {}",
                self.base_url
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(PrloadError::InvalidUrl(format!(
                "base URL must not carry a query or fragment: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// 启动前校验，任何错误都会在第一次迭代前终止运行
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(PrloadError::ConfigError(
                "at least one stage is required".to_string(),
            ));
        }
        let total = self.total_duration();
        if total.is_zero() {
            return Err(PrloadError::ConfigError(
                "total stage duration must be greater than zero".to_string(),
            ));
        }
        ensure_within_limit(total, "total stage duration")?;
        for (name, value) in [
            ("pacing", self.pacing),
            ("graceful_ramp_down", self.graceful_ramp_down),
            ("graceful_stop", self.graceful_stop),
            ("request_timeout", self.request_timeout),
            ("tick", self.tick),
        ] {
            ensure_within_limit(value, name)?;
        }
        if self.tick.is_zero() {
            return Err(PrloadError::ConfigError(
                "tick must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(PrloadError::ConfigError(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        self.parsed_base_url()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_profile() {
        let config = LoadConfig::default();
        assert_eq!(config.stages.len(), 3);
        assert_eq!(config.total_duration(), Duration::from_secs(80));
        assert_eq!(config.pacing, Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stage_from_str() {
        let stage: Stage = "1m30s:25".parse().unwrap();
        assert_eq!(stage, Stage::new(Duration::from_secs(90), 25));

        assert!("20s".parse::<Stage>().is_err());
        assert!("20s:-1".parse::<Stage>().is_err());
        assert!("later:5".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_display_round_trips_cli_form() {
        let stage = Stage::new(Duration::from_secs(20), 10);
        assert_eq!(stage.to_string(), "20s:10");
    }

    #[test]
    fn test_validate_rejects_empty_stages() {
        let config = LoadConfig {
            stages: vec![],
            ..LoadConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PrloadError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_total_duration() {
        let config = LoadConfig {
            stages: vec![Stage::new(Duration::ZERO, 5)],
            ..LoadConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlong_durations() {
        let huge = Duration::from_secs(u64::MAX);
        let config = LoadConfig {
            stages: vec![Stage::new(huge, 1), Stage::new(huge, 1)],
            ..LoadConfig::default()
        };
        assert_eq!(config.total_duration(), Duration::MAX);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PrloadError::InvalidDuration(_)));
        assert!(err.is_fatal());

        let config = LoadConfig {
            graceful_stop: huge,
            ..LoadConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stage_from_str_rejects_overlong_duration() {
        assert!("18446744073709551615:1".parse::<Stage>().is_err());
        assert!("9000h:1".parse::<Stage>().is_err());
    }

    #[test]
    fn test_deserialize_rejects_overlong_integer_seconds() {
        let result: std::result::Result<LoadConfig, _> =
            toml::from_str("graceful_stop = 9223372036854775807\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        for bad in ["not a url", "ftp://example.com", "http://host/?q=1"] {
            let config = LoadConfig {
                base_url: bad.to_string(),
                ..LoadConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(matches!(err, PrloadError::InvalidUrl(_)), "{}", bad);
            assert!(err.is_fatal());
        }
    }

    #[test]
    fn test_deserialize_partial_toml_keeps_defaults() {
        let config: LoadConfig = toml::from_str(
            r#"
base_url = "http://svc:9000"
pacing = "50ms"

[[stages]]
duration = "5s"
target = 3
"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://svc:9000");
        assert_eq!(config.pacing, Duration::from_millis(50));
        assert_eq!(config.stages, vec![Stage::new(Duration::from_secs(5), 3)]);
        assert_eq!(config.start_vus, 1);
        assert_eq!(config.graceful_stop, Duration::from_secs(30));
    }

    #[test]
    fn test_deserialize_integer_seconds() {
        let config: LoadConfig = toml::from_str(
            r#"
graceful_stop = 5

[[stages]]
duration = 10
target = 2
"#,
        )
        .unwrap();
        assert_eq!(config.graceful_stop, Duration::from_secs(5));
        assert_eq!(config.stages[0].duration, Duration::from_secs(10));
    }

    #[test]
    fn test_deserialize_rejects_unknown_keys() {
        let result: std::result::Result<LoadConfig, _> = toml::from_str("vus = 10\n");
        assert!(result.is_err());
    }
}
