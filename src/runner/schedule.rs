use std::time::Duration;

use crate::config::{LoadConfig, Stage};

/// 一个阶段展开后的时间区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: Duration,
    pub end: Duration,
    pub from: u64,
    pub to: u64,
}

impl Segment {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// 区间内 `elapsed` 时刻的目标 VU 数
    ///
    /// 线性插值，向 `from` 取整：爬升时向下取整，下降时向上取整，
    /// 因此结果永远落在 `[min(from, to), max(from, to)]` 内。
    fn target_at(&self, elapsed: Duration) -> u64 {
        let span = self.duration().as_nanos();
        if span == 0 || self.from == self.to {
            return self.to;
        }

        let progress = elapsed.saturating_sub(self.start).as_nanos().min(span);
        if self.to > self.from {
            self.from + scale(self.to - self.from, progress, span)
        } else {
            self.from - scale(self.from - self.to, progress, span)
        }
    }
}

/// `delta * progress / span`，向下取整，`progress <= span`
///
/// 乘积超出 u128 时同时右移 `progress` 和 `span`，比例不变，结果不超过 `delta`。
fn scale(delta: u64, mut progress: u128, mut span: u128) -> u64 {
    let delta = u128::from(delta);
    while delta.checked_mul(progress).is_none() {
        progress >>= 1;
        span >>= 1;
    }
    (delta * progress / span.max(1)) as u64
}

/// 按阶段计算任意时刻的目标并发数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampSchedule {
    start_vus: u64,
    segments: Vec<Segment>,
}

impl RampSchedule {
    pub fn new(start_vus: u64, stages: &[Stage]) -> Self {
        let mut segments = Vec::with_capacity(stages.len());
        let mut start = Duration::ZERO;
        let mut from = start_vus;

        for stage in stages {
            let end = start.saturating_add(stage.duration);
            segments.push(Segment {
                start,
                end,
                from,
                to: stage.target,
            });
            start = end;
            from = stage.target;
        }

        Self {
            start_vus,
            segments,
        }
    }

    pub fn from_config(config: &LoadConfig) -> Self {
        Self::new(config.start_vus, &config.stages)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_duration(&self) -> Duration {
        self.segments.last().map(|s| s.end).unwrap_or_default()
    }

    /// 运行过程中可能出现的最大并发数
    pub fn max_vus(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| s.to)
            .fold(self.start_vus, u64::max)
    }

    /// `elapsed` 时刻应有的并发 VU 数；超过总时长后保持最后一个目标
    pub fn target_at(&self, elapsed: Duration) -> u64 {
        // 零时长阶段的 start == end，永远不会被选中，相当于瞬间跳变
        match self.segments.iter().find(|s| elapsed < s.end) {
            Some(segment) => segment.target_at(elapsed),
            None => self.segments.last().map_or(self.start_vus, |s| s.to),
        }
    }

    /// `elapsed` 所处阶段的序号（从 0 开始）
    pub fn stage_index_at(&self, elapsed: Duration) -> Option<usize> {
        self.segments.iter().position(|s| elapsed < s.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> RampSchedule {
        RampSchedule::new(
            0,
            &[
                Stage::new(Duration::from_secs(20), 10),
                Stage::new(Duration::from_secs(40), 30),
                Stage::new(Duration::from_secs(20), 0),
            ],
        )
    }

    #[test]
    fn test_reference_profile_boundaries() {
        let schedule = reference();
        assert_eq!(schedule.total_duration(), Duration::from_secs(80));
        assert_eq!(schedule.max_vus(), 30);

        assert_eq!(schedule.target_at(Duration::ZERO), 0);
        assert_eq!(schedule.target_at(Duration::from_secs(10)), 5);
        assert_eq!(schedule.target_at(Duration::from_secs(20)), 10);
        assert_eq!(schedule.target_at(Duration::from_secs(40)), 20);
        assert_eq!(schedule.target_at(Duration::from_secs(60)), 30);
        assert_eq!(schedule.target_at(Duration::from_secs(70)), 15);
        assert_eq!(schedule.target_at(Duration::from_secs(80)), 0);
    }

    #[test]
    fn test_rounding_stays_toward_previous_target() {
        let schedule = reference();
        // 爬升：0 -> 10 的 19.9s 处插值为 9.95，取 9
        assert_eq!(schedule.target_at(Duration::from_millis(19_900)), 9);
        // 下降：30 -> 0 的 60.1s 处插值为 29.85，取 30
        assert_eq!(schedule.target_at(Duration::from_millis(60_100)), 30);
    }

    #[test]
    fn test_target_always_within_stage_bounds() {
        let schedule = reference();
        let mut t = Duration::ZERO;
        while t < schedule.total_duration() {
            let idx = schedule.stage_index_at(t).unwrap();
            let seg = schedule.segments()[idx];
            let target = schedule.target_at(t);
            assert!(
                target >= seg.from.min(seg.to) && target <= seg.from.max(seg.to),
                "t={:?} target={} seg={:?}",
                t,
                target,
                seg
            );
            t += Duration::from_millis(250);
        }
    }

    #[test]
    fn test_hold_stage_keeps_count() {
        let schedule = RampSchedule::new(
            4,
            &[
                Stage::new(Duration::from_secs(10), 4),
                Stage::new(Duration::from_secs(10), 8),
            ],
        );
        assert_eq!(schedule.target_at(Duration::from_secs(3)), 4);
        assert_eq!(schedule.target_at(Duration::from_secs(9)), 4);
        assert_eq!(schedule.target_at(Duration::from_secs(15)), 6);
    }

    #[test]
    fn test_zero_duration_stage_jumps() {
        let schedule = RampSchedule::new(
            1,
            &[
                Stage::new(Duration::ZERO, 20),
                Stage::new(Duration::from_secs(10), 20),
            ],
        );
        assert_eq!(schedule.target_at(Duration::ZERO), 20);
        assert_eq!(schedule.target_at(Duration::from_secs(5)), 20);
    }

    #[test]
    fn test_start_vus_is_first_ramp_origin() {
        let schedule = RampSchedule::new(1, &[Stage::new(Duration::from_secs(10), 11)]);
        assert_eq!(schedule.target_at(Duration::ZERO), 1);
        assert_eq!(schedule.target_at(Duration::from_secs(5)), 6);
    }

    #[test]
    fn test_huge_stages_do_not_overflow() {
        let huge = Duration::from_secs(u64::MAX);
        let schedule = RampSchedule::new(
            0,
            &[Stage::new(huge, u64::MAX), Stage::new(huge, 0)],
        );
        assert_eq!(schedule.total_duration(), Duration::MAX);
        assert_eq!(schedule.target_at(Duration::ZERO), 0);

        let midway = schedule.target_at(Duration::from_secs(u64::MAX / 2));
        assert!(midway > u64::MAX / 4 && midway < u64::MAX / 4 * 3, "{}", midway);
        assert_eq!(schedule.target_at(huge), u64::MAX);
    }

    #[test]
    fn test_past_end_holds_last_target() {
        let schedule = reference();
        assert_eq!(schedule.target_at(Duration::from_secs(500)), 0);
        assert_eq!(schedule.stage_index_at(Duration::from_secs(500)), None);

        let empty = RampSchedule::new(3, &[]);
        assert_eq!(empty.target_at(Duration::from_secs(1)), 3);
        assert_eq!(empty.total_duration(), Duration::ZERO);
    }
}
