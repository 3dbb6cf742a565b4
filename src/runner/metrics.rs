use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use tracing::warn;
use uuid::Uuid;

use crate::runner::types::{CheckSummary, RequestSummary, RunSummary, TrendSummary};

/// 直方图上限：1 小时，单位微秒；更长的样本按上限记录
const HISTOGRAM_MAX_US: u64 = 3_600_000_000;

fn latency_histogram() -> Histogram<u64> {
    Histogram::new_with_bounds(1, HISTOGRAM_MAX_US, 3).expect("static histogram bounds are valid")
}

fn record_micros(histogram: &mut Histogram<u64>, duration: Duration) {
    let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    histogram.saturating_record(us);
}

#[derive(Debug)]
struct RequestSamples {
    name: String,
    latency: Histogram<u64>,
    transport_errors: u64,
}

/// 全局统计收集器，所有 VU 并发写入
///
/// 计数器使用原子变量；检查结果和延迟直方图放在互斥锁里，
/// 按首次出现的顺序保存，汇总时保持脚本中的步骤顺序。
/// 延迟按请求名各记一个 HDR 直方图，内存占用与请求数无关。
#[derive(Debug)]
pub struct Metrics {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    iterations: AtomicU64,
    interrupted: AtomicU64,
    http_reqs: AtomicU64,
    transport_errors: AtomicU64,
    active_vus: AtomicU64,
    peak_vus: AtomicU64,
    checks: Mutex<Vec<CheckSummary>>,
    requests: Mutex<Vec<RequestSamples>>,
    iteration_durations: Mutex<Histogram<u64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 某个 VU panic 不应该让统计整体不可用
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            iterations: AtomicU64::new(0),
            interrupted: AtomicU64::new(0),
            http_reqs: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            active_vus: AtomicU64::new(0),
            peak_vus: AtomicU64::new(0),
            checks: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            iteration_durations: Mutex::new(latency_histogram()),
        }
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        let mut checks = lock(&self.checks);
        let idx = match checks.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                checks.push(CheckSummary {
                    name: name.to_string(),
                    passes: 0,
                    fails: 0,
                });
                checks.len() - 1
            }
        };
        if passed {
            checks[idx].passes += 1;
        } else {
            checks[idx].fails += 1;
        }
    }

    /// 收到响应（不论状态码）
    pub fn record_response(&self, request: &str, duration: Duration) {
        self.http_reqs.fetch_add(1, Ordering::Relaxed);
        self.with_request(request, |samples| record_micros(&mut samples.latency, duration));
    }

    /// 网络层失败：超时、拒绝连接、DNS 等
    pub fn record_transport_error(&self, request: &str) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
        self.with_request(request, |samples| samples.transport_errors += 1);
    }

    pub fn record_iteration(&self, duration: Duration) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        record_micros(&mut lock(&self.iteration_durations), duration);
    }

    /// 超过优雅退出期限被强制中止的迭代
    pub fn record_interrupted(&self) {
        self.interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_active_vus(&self, count: u64) {
        self.active_vus.store(count, Ordering::Relaxed);
        self.peak_vus.fetch_max(count, Ordering::Relaxed);
    }

    pub fn active_vus(&self) -> u64 {
        self.active_vus.load(Ordering::Relaxed)
    }

    pub fn peak_vus(&self) -> u64 {
        self.peak_vus.load(Ordering::Relaxed)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    fn with_request<F>(&self, request: &str, f: F)
    where
        F: FnOnce(&mut RequestSamples),
    {
        let mut requests = lock(&self.requests);
        match requests.iter_mut().find(|r| r.name == request) {
            Some(samples) => f(samples),
            None => {
                let mut samples = RequestSamples {
                    name: request.to_string(),
                    latency: latency_histogram(),
                    transport_errors: 0,
                };
                f(&mut samples);
                requests.push(samples);
            }
        }
    }

    /// 生成汇总快照，`elapsed` 为运行的墙钟时长
    pub fn summary(&self, elapsed: Duration) -> RunSummary {
        let checks = lock(&self.checks).clone();

        let (requests, http_req_duration) = {
            let requests = lock(&self.requests);
            let mut all = latency_histogram();
            for r in requests.iter() {
                if let Err(e) = all.add(&r.latency) {
                    warn!("Failed to merge latency of {}: {:?}", r.name, e);
                }
            }
            let per_request = requests
                .iter()
                .map(|r| RequestSummary {
                    name: r.name.clone(),
                    transport_errors: r.transport_errors,
                    duration: TrendSummary::from_histogram(&r.latency),
                })
                .collect();
            (per_request, TrendSummary::from_histogram(&all))
        };

        let iteration_duration = TrendSummary::from_histogram(&lock(&self.iteration_durations));

        RunSummary {
            run_id: self.run_id.to_string(),
            started_at: self.started_at,
            duration_secs: elapsed.as_secs_f64(),
            iterations: self.iterations.load(Ordering::Relaxed),
            interrupted_iterations: self.interrupted.load(Ordering::Relaxed),
            vus_peak: self.peak_vus.load(Ordering::Relaxed),
            http_reqs: self.http_reqs.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            checks,
            http_req_duration,
            iteration_duration,
            requests,
        }
    }
}
