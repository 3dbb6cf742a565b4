use std::fmt::Write;
use std::time::Duration;

/// 把时长格式化成可被 `parse_duration` 原样读回的形式，如 `1m30s`、`200ms`、`1.5s`
///
/// 小数部分精确到纳秒，不做四舍五入。
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    if duration < Duration::from_secs(1) {
        let nanos = duration.subsec_nanos();
        let ms = format!("{}.{:06}", nanos / 1_000_000, nanos % 1_000_000);
        return format!("{}ms", trim_fraction(&ms));
    }

    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let nanos = duration.subsec_nanos();

    let mut output = String::new();
    if hours > 0 {
        let _ = write!(output, "{}h", hours);
    }
    if minutes > 0 {
        let _ = write!(output, "{}m", minutes);
    }
    if nanos > 0 {
        let secs = format!("{}.{:09}", seconds, nanos);
        let _ = write!(output, "{}s", trim_fraction(&secs));
    } else if seconds > 0 {
        let _ = write!(output, "{}s", seconds);
    }
    output
}

/// 延迟展示，输入单位为毫秒
pub fn format_latency(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.0}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

/// 0.0..=1.0 的比例转成百分比
pub fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
