use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::{PrloadError, Result};

/// 单个时长的上限：365 天
///
/// 阶段时长之和、宽限期截止时间都要在 `Instant` 上做加法，
/// 上限保证这些运算不会溢出。
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 3600);

/// 解析 k6 风格的时长字符串
///
/// 支持 `200ms`、`20s`、`1m30s`、`1.5h` 这类由 `<数字><单位>` 拼接而成的写法，
/// 单位为 `ms` / `s` / `m` / `h`。纯整数按秒处理。超过 [`MAX_DURATION`] 的值报错。
pub fn parse_duration(input: &str) -> Result<Duration> {
    static FULL_REGEX: OnceLock<Regex> = OnceLock::new();
    static PART_REGEX: OnceLock<Regex> = OnceLock::new();

    let s = input.trim();
    if s.is_empty() {
        return Err(PrloadError::InvalidDuration("empty duration".to_string()));
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let secs = s
            .parse::<u64>()
            .map_err(|_| PrloadError::InvalidDuration(input.to_string()))?;
        return ensure_within_limit(Duration::from_secs(secs), input);
    }

    let full = FULL_REGEX
        .get_or_init(|| Regex::new(r"^(?:\d+(?:\.\d+)?(?:ms|s|m|h))+$").unwrap());
    if !full.is_match(s) {
        return Err(PrloadError::InvalidDuration(input.to_string()));
    }

    let limit = MAX_DURATION.as_nanos() as u64;
    let part = PART_REGEX.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)(ms|s|m|h)").unwrap());
    let mut total_nanos = 0u64;
    for caps in part.captures_iter(s) {
        let value: f64 = caps[1]
            .parse()
            .map_err(|_| PrloadError::InvalidDuration(input.to_string()))?;
        let unit_nanos = match &caps[2] {
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => unreachable!("regex only matches known units"),
        };
        // 每段单独取整到纳秒再做整数累加，避免大数相加丢失精度
        let nanos = (value * unit_nanos).round();
        if !nanos.is_finite() || nanos > limit as f64 {
            return Err(too_long(input));
        }
        total_nanos = total_nanos.saturating_add(nanos as u64);
    }

    ensure_within_limit(Duration::from_nanos(total_nanos), input)
}

/// 检查时长不超过 [`MAX_DURATION`]，`input` 用于错误信息
pub fn ensure_within_limit(duration: Duration, input: &str) -> Result<Duration> {
    if duration > MAX_DURATION {
        Err(too_long(input))
    } else {
        Ok(duration)
    }
}

fn too_long(input: &str) -> PrloadError {
    PrloadError::InvalidDuration(format!(
        "{} exceeds the maximum of {}",
        input.trim(),
        crate::utils::format_duration(MAX_DURATION)
    ))
}

/// serde 适配：配置文件中的时长既可以写字符串也可以写整数秒
pub mod serde_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::utils::format_duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Secs(u64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => super::parse_duration(&s).map_err(serde::de::Error::custom),
            Raw::Secs(secs) => super::ensure_within_limit(Duration::from_secs(secs), &secs.to_string())
                .map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }
}
