use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::LoadConfig;
use crate::config::duration::MAX_DURATION;
use crate::runner::metrics::Metrics;
use crate::runner::schedule::RampSchedule;
use crate::runner::types::{IterationId, RunSummary};

/// 每个 VU 循环执行的脚本
///
/// 实现方只负责一次迭代；检查结果、传输错误、延迟都写入 `metrics`，
/// 迭代本身不返回错误，失败也不会中断运行。
pub trait Scenario: Send + Sync + 'static {
    fn run_iteration(
        &self,
        id: IterationId,
        metrics: &Metrics,
    ) -> impl Future<Output = ()> + Send;
}

/// 调度相关的时间参数
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    pub tick: Duration,
    pub graceful_ramp_down: Duration,
    pub graceful_stop: Duration,
}

impl From<&LoadConfig> for ExecutorOptions {
    fn from(config: &LoadConfig) -> Self {
        Self {
            tick: config.tick,
            graceful_ramp_down: config.graceful_ramp_down,
            graceful_stop: config.graceful_stop,
        }
    }
}

/// VU 编号及其迭代计数；VU 被回收后再次启用时计数继续累加
#[derive(Debug, Clone)]
struct VuSlot {
    id: u64,
    next_iter: Arc<AtomicU64>,
}

struct RunningVu {
    slot: VuSlot,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

struct RetiringVu {
    slot: VuSlot,
    handle: JoinHandle<()>,
    deadline: Instant,
}

#[derive(Default)]
struct VuPool {
    active: Vec<RunningVu>,
    retiring: Vec<RetiringVu>,
    idle: BTreeMap<u64, VuSlot>,
    next_id: u64,
}

impl VuPool {
    /// 优先复用编号最小的空闲 VU
    fn acquire(&mut self) -> VuSlot {
        if let Some((_, slot)) = self.idle.pop_first() {
            return slot;
        }
        self.next_id += 1;
        VuSlot {
            id: self.next_id,
            next_iter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 最近启用的 VU 最先退出，当前迭代结束后才真正停下
    fn retire_one(&mut self, grace: Duration) {
        if let Some(vu) = self.active.pop() {
            vu.stop.store(true, Ordering::Relaxed);
            debug!(vu = vu.slot.id, "Retiring VU");
            self.retiring.push(RetiringVu {
                slot: vu.slot,
                handle: vu.handle,
                deadline: deadline_after(grace),
            });
        }
    }

    /// 回收已结束的 VU；超过期限的强制中止并计为被中断的迭代
    ///
    /// 活跃 VU 只有在迭代 panic 时才会自行结束。它的编号同样退回空闲池，
    /// 下一次调整并发时由 `scale_to` 补上。
    async fn reap(&mut self, metrics: &Metrics) {
        let (crashed, running): (Vec<_>, Vec<_>) = self
            .active
            .drain(..)
            .partition(|vu| vu.handle.is_finished());
        self.active = running;
        for vu in crashed {
            join_finished(vu.slot.id, vu.handle, metrics).await;
            self.idle.insert(vu.slot.id, vu.slot);
        }

        let now = Instant::now();
        let mut still_running = Vec::with_capacity(self.retiring.len());

        for vu in self.retiring.drain(..) {
            if vu.handle.is_finished() {
                join_finished(vu.slot.id, vu.handle, metrics).await;
                self.idle.insert(vu.slot.id, vu.slot);
            } else if now >= vu.deadline {
                warn!(vu = vu.slot.id, "VU exceeded graceful ramp-down, aborting");
                vu.handle.abort();
                metrics.record_interrupted();
                self.idle.insert(vu.slot.id, vu.slot);
            } else {
                still_running.push(vu);
            }
        }

        self.retiring = still_running;
    }
}

/// 等待一个已结束的 VU 任务；panic 的迭代没有完成，计为被中断
async fn join_finished(vu_id: u64, handle: JoinHandle<()>, metrics: &Metrics) {
    if let Err(e) = handle.await {
        if e.is_panic() {
            warn!(vu = vu_id, "VU panicked: {}", e);
            metrics.record_interrupted();
        }
    }
}

/// `grace` 之后的时间点；溢出时退回到 [`MAX_DURATION`] 之后
fn deadline_after(grace: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(grace).unwrap_or_else(|| now + MAX_DURATION)
}

/// 负载驱动：按计划调整并发 VU 数，每个 VU 背靠背执行迭代
pub struct LoadExecutor<S: Scenario> {
    scenario: Arc<S>,
    schedule: RampSchedule,
    options: ExecutorOptions,
    metrics: Arc<Metrics>,
}

impl<S: Scenario> LoadExecutor<S> {
    pub fn new(scenario: S, schedule: RampSchedule, options: ExecutorOptions) -> Self {
        Self {
            scenario: Arc::new(scenario),
            schedule,
            options,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn from_config(scenario: S, config: &LoadConfig) -> Self {
        Self::new(
            scenario,
            RampSchedule::from_config(config),
            ExecutorOptions::from(config),
        )
    }

    /// 共享的统计收集器，可在运行中读取当前 VU 数等实时数据
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn schedule(&self) -> &RampSchedule {
        &self.schedule
    }

    /// 完整执行所有阶段
    pub async fn run(&self) -> RunSummary {
        self.run_until(std::future::pending()).await
    }

    /// 执行所有阶段，`shutdown` 完成时提前进入优雅退出
    pub async fn run_until<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let total = self.schedule.total_duration();
        let mut pool = VuPool::default();
        let mut current_stage = None;

        let mut ticker = tokio::time::interval(self.options.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            "Starting run: {} stage(s), {:?} total, up to {} VUs",
            self.schedule.segments().len(),
            total,
            self.schedule.max_vus()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    info!("Interrupt received, stopping new iterations");
                    break;
                }
            }

            let elapsed = start.elapsed();
            pool.reap(&self.metrics).await;
            if elapsed >= total {
                break;
            }

            let stage = self.schedule.stage_index_at(elapsed);
            if stage != current_stage {
                if let Some(idx) = stage {
                    let seg = self.schedule.segments()[idx];
                    info!(
                        "Stage {}: {} -> {} VUs over {:?}",
                        idx + 1,
                        seg.from,
                        seg.to,
                        seg.duration()
                    );
                }
                current_stage = stage;
            }

            let target = self.schedule.target_at(elapsed) as usize;
            self.scale_to(&mut pool, target);
            self.metrics.set_active_vus(pool.active.len() as u64);
        }

        self.drain(&mut pool).await;
        self.metrics.set_active_vus(0);

        let elapsed = start.elapsed();
        info!(
            "Run finished in {:?}: {} iterations",
            elapsed,
            self.metrics.iterations()
        );
        self.metrics.summary(elapsed)
    }

    fn scale_to(&self, pool: &mut VuPool, target: usize) {
        while pool.active.len() < target {
            let slot = pool.acquire();
            let vu = self.spawn_vu(slot);
            pool.active.push(vu);
        }
        while pool.active.len() > target {
            pool.retire_one(self.options.graceful_ramp_down);
        }
    }

    fn spawn_vu(&self, slot: VuSlot) -> RunningVu {
        let stop = Arc::new(AtomicBool::new(false));
        let scenario = self.scenario.clone();
        let metrics = self.metrics.clone();
        let next_iter = slot.next_iter.clone();
        let vu_id = slot.id;
        let stop_flag = stop.clone();

        debug!(vu = vu_id, "Starting VU");
        let handle = tokio::spawn(async move {
            while !stop_flag.load(Ordering::Relaxed) {
                let iter = next_iter.fetch_add(1, Ordering::Relaxed);
                let started = Instant::now();
                scenario
                    .run_iteration(IterationId::new(vu_id, iter), &metrics)
                    .await;
                metrics.record_iteration(started.elapsed());
            }
        });

        RunningVu { slot, stop, handle }
    }

    /// 停止所有 VU：不再开始新迭代，等待进行中的迭代，超时后强制中止
    async fn drain(&self, pool: &mut VuPool) {
        let deadline = deadline_after(self.options.graceful_stop);

        for vu in pool.active.drain(..) {
            vu.stop.store(true, Ordering::Relaxed);
            pool.retiring.push(RetiringVu {
                slot: vu.slot,
                handle: vu.handle,
                deadline,
            });
        }

        let in_flight = pool.retiring.len();
        if in_flight > 0 {
            debug!("Waiting for {} VU(s) to finish their iteration", in_flight);
        }

        for mut vu in pool.retiring.drain(..) {
            let deadline = vu.deadline.min(deadline);
            match tokio::time::timeout_at(deadline, &mut vu.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if e.is_panic() {
                        warn!(vu = vu.slot.id, "VU panicked: {}", e);
                        self.metrics.record_interrupted();
                    }
                }
                Err(_) => {
                    warn!(vu = vu.slot.id, "VU exceeded graceful stop, aborting");
                    vu.handle.abort();
                    self.metrics.record_interrupted();
                }
            }
        }
    }
}
