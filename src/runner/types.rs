use std::fmt;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// 迭代身份：第几个 VU 的第几次迭代
///
/// VU 编号从 1 开始，迭代编号在每个 VU 内从 0 开始。
/// 同一次运行中不会有两个迭代拥有相同的 `IterationId`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IterationId {
    pub vu: u64,
    pub iter: u64,
}

impl IterationId {
    pub fn new(vu: u64, iter: u64) -> Self {
        Self { vu, iter }
    }
}

impl fmt::Display for IterationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.vu, self.iter)
    }
}

/// 单个命名检查的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    /// 通过率；没有样本时为 0
    pub fn rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passes as f64 / total as f64,
        }
    }
}

/// 延迟分布，单位毫秒
///
/// 由 HDR 直方图生成，百分位数精确到 3 位有效数字。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub count: u64,
    pub min: f64,
    pub avg: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: f64,
}

impl TrendSummary {
    /// `histogram` 的记录单位为微秒
    pub fn from_histogram(histogram: &Histogram<u64>) -> Self {
        if histogram.is_empty() {
            return Self::default();
        }

        let ms = |us: u64| us as f64 / 1000.0;
        Self {
            count: histogram.len(),
            min: ms(histogram.min()),
            avg: histogram.mean() / 1000.0,
            med: ms(histogram.value_at_quantile(0.5)),
            p90: ms(histogram.value_at_quantile(0.9)),
            p95: ms(histogram.value_at_quantile(0.95)),
            max: ms(histogram.max()),
        }
    }
}

/// 单个请求（按名称分组）的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub name: String,
    pub transport_errors: u64,
    pub duration: TrendSummary,
}

/// 整次运行的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// 墙钟时长（秒）
    pub duration_secs: f64,
    pub iterations: u64,
    pub interrupted_iterations: u64,
    pub vus_peak: u64,
    pub http_reqs: u64,
    pub transport_errors: u64,
    pub checks: Vec<CheckSummary>,
    pub http_req_duration: TrendSummary,
    pub iteration_duration: TrendSummary,
    pub requests: Vec<RequestSummary>,
}

impl RunSummary {
    pub fn checks_passed(&self) -> u64 {
        self.checks.iter().map(|c| c.passes).sum()
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }

    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn request(&self, name: &str) -> Option<&RequestSummary> {
        self.requests.iter().find(|r| r.name == name)
    }

    /// 每秒完成的请求数
    pub fn http_reqs_rate(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.http_reqs as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}
