use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use prload::config::Stage;
use prload::runner::{ExecutorOptions, IterationId, LoadExecutor, Metrics, RampSchedule, Scenario};

/// 只睡眠并记录迭代身份的内存场景
#[derive(Clone)]
struct Recording {
    delay: Duration,
    started: Arc<AtomicU64>,
    seen: Arc<Mutex<Vec<IterationId>>>,
}

impl Recording {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: Arc::new(AtomicU64::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Scenario for Recording {
    async fn run_iteration(&self, id: IterationId, metrics: &Metrics) {
        self.started.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.delay).await;
        self.seen.lock().unwrap().push(id);
        metrics.record_check("ok", true);
    }
}

fn options(grace: Duration) -> ExecutorOptions {
    ExecutorOptions {
        tick: Duration::from_millis(10),
        graceful_ramp_down: grace,
        graceful_stop: grace,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_active_vus_follow_schedule() {
    let schedule = RampSchedule::new(
        0,
        &[
            Stage::new(Duration::from_millis(300), 6),
            Stage::new(Duration::from_millis(300), 6),
            Stage::new(Duration::from_millis(300), 0),
        ],
    );
    let scenario = Recording::new(Duration::from_millis(5));
    let executor = LoadExecutor::new(scenario.clone(), schedule, options(Duration::from_secs(2)));

    // 采样当前 VU 数
    let metrics = executor.metrics();
    let done = Arc::new(AtomicBool::new(false));
    let sampler = {
        let done = done.clone();
        tokio::spawn(async move {
            let mut max_seen = 0;
            while !done.load(Ordering::Relaxed) {
                max_seen = max_seen.max(metrics.active_vus());
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            max_seen
        })
    };

    let started = Instant::now();
    let summary = executor.run().await;
    done.store(true, Ordering::Relaxed);
    let max_seen = sampler.await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(900));
    assert!(max_seen <= 6, "max_seen = {}", max_seen);
    assert_eq!(summary.vus_peak, 6);
    assert!(summary.iterations > 0);
    assert_eq!(summary.interrupted_iterations, 0);
    assert_eq!(summary.check("ok").unwrap().passes, summary.iterations);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_iteration_ids_are_unique() {
    let schedule = RampSchedule::new(
        2,
        &[
            Stage::new(Duration::from_millis(200), 5),
            Stage::new(Duration::from_millis(200), 0),
        ],
    );
    let scenario = Recording::new(Duration::from_millis(3));
    let executor = LoadExecutor::new(scenario.clone(), schedule, options(Duration::from_secs(2)));
    executor.run().await;

    let seen = scenario.seen.lock().unwrap();
    let unique: HashSet<_> = seen.iter().copied().collect();
    assert!(!seen.is_empty());
    assert_eq!(unique.len(), seen.len());
    assert!(seen.iter().all(|id| id.vu >= 1 && id.vu <= 5));
}

/// 缩容到 0 后再扩容：复用原 VU 编号，迭代编号继续累加
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_vu_numbers_are_reused_after_ramp_down() {
    let schedule = RampSchedule::new(
        2,
        &[
            Stage::new(Duration::from_millis(100), 2),
            Stage::new(Duration::ZERO, 0),
            Stage::new(Duration::from_millis(150), 0),
            Stage::new(Duration::ZERO, 2),
            Stage::new(Duration::from_millis(150), 2),
        ],
    );
    let scenario = Recording::new(Duration::from_millis(5));
    let executor = LoadExecutor::new(scenario.clone(), schedule, options(Duration::from_secs(2)));
    executor.run().await;

    let seen = scenario.seen.lock().unwrap();
    let vus: HashSet<_> = seen.iter().map(|id| id.vu).collect();
    assert_eq!(vus, HashSet::from([1, 2]));

    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len());
}

/// 下降阶段退出的 VU 会把当前迭代跑完
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ramp_down_drains_in_flight_iterations() {
    let schedule = RampSchedule::new(
        3,
        &[
            Stage::new(Duration::from_millis(50), 3),
            Stage::new(Duration::ZERO, 0),
            Stage::new(Duration::from_millis(100), 0),
        ],
    );
    let scenario = Recording::new(Duration::from_millis(120));
    let executor = LoadExecutor::new(scenario.clone(), schedule, options(Duration::from_secs(2)));
    let summary = executor.run().await;

    assert_eq!(summary.interrupted_iterations, 0);
    assert_eq!(summary.iterations, scenario.started.load(Ordering::Relaxed));
    assert_eq!(summary.iterations, 3);
}

/// 超过优雅退出期限的迭代被强制中止并计入 interrupted
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_graceful_stop_aborts_slow_iterations() {
    let schedule = RampSchedule::new(2, &[Stage::new(Duration::from_millis(100), 2)]);
    let scenario = Recording::new(Duration::from_secs(30));
    let executor =
        LoadExecutor::new(scenario.clone(), schedule, options(Duration::from_millis(50)));

    let started = Instant::now();
    let summary = executor.run().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(summary.iterations, 0);
    assert_eq!(summary.interrupted_iterations, 2);
    assert_eq!(scenario.started.load(Ordering::Relaxed), 2);
}

/// 外部中断：停止新迭代并提前结束
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interrupt_stops_run_early() {
    let schedule = RampSchedule::new(1, &[Stage::new(Duration::from_secs(60), 4)]);
    let scenario = Recording::new(Duration::from_millis(5));
    let executor = LoadExecutor::new(scenario.clone(), schedule, options(Duration::from_secs(2)));

    let started = Instant::now();
    let summary = executor
        .run_until(tokio::time::sleep(Duration::from_millis(150)))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(summary.iterations > 0);
    assert_eq!(summary.interrupted_iterations, 0);
    assert_eq!(executor.metrics().active_vus(), 0);
}

/// 缩容后的 VU 超过 graceful_ramp_down 仍未结束时被强制中止
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_graceful_ramp_down_aborts_slow_iterations() {
    let schedule = RampSchedule::new(
        2,
        &[
            Stage::new(Duration::from_millis(50), 2),
            Stage::new(Duration::ZERO, 0),
            Stage::new(Duration::from_millis(300), 0),
        ],
    );
    let scenario = Recording::new(Duration::from_secs(30));
    let options = ExecutorOptions {
        tick: Duration::from_millis(10),
        graceful_ramp_down: Duration::from_millis(20),
        graceful_stop: Duration::from_secs(10),
    };
    let executor = LoadExecutor::new(scenario.clone(), schedule, options);

    let started = Instant::now();
    let summary = executor.run().await;

    // 中止发生在阶段内部，而不是等到 graceful_stop
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(summary.iterations, 0);
    assert_eq!(summary.interrupted_iterations, 2);
    assert_eq!(scenario.started.load(Ordering::Relaxed), 2);
}

/// 第一次迭代就 panic 的场景
#[derive(Clone)]
struct PanicsOnce {
    seen: Arc<Mutex<Vec<IterationId>>>,
}

impl Scenario for PanicsOnce {
    async fn run_iteration(&self, id: IterationId, metrics: &Metrics) {
        if id == IterationId::new(1, 0) {
            panic!("scenario failure in {}", id);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.seen.lock().unwrap().push(id);
        metrics.record_check("ok", true);
    }
}

/// panic 的 VU 会被发现并用同一编号重新启动，并发数不会永久缺一个
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicked_vu_is_replaced() {
    let schedule = RampSchedule::new(2, &[Stage::new(Duration::from_millis(300), 2)]);
    let scenario = PanicsOnce {
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let executor = LoadExecutor::new(scenario.clone(), schedule, options(Duration::from_secs(2)));
    let summary = executor.run().await;

    let seen = scenario.seen.lock().unwrap();
    assert!(
        seen.iter().any(|id| id.vu == 1 && id.iter >= 1),
        "VU 1 never resumed: {:?}",
        *seen
    );
    assert!(!seen.contains(&IterationId::new(1, 0)));
    assert_eq!(summary.interrupted_iterations, 1);
    assert_eq!(summary.vus_peak, 2);
    assert_eq!(summary.check("ok").unwrap().passes, summary.iterations);
}
