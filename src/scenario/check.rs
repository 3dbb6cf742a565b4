use crate::http::Status;

/// 对状态码的期望
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusExpectation {
    Exact(u16),
    AnyOf(&'static [u16]),
    /// 2xx
    Success,
}

impl StatusExpectation {
    pub fn matches(&self, status: Status) -> bool {
        match self {
            StatusExpectation::Exact(code) => status.code() == *code,
            StatusExpectation::AnyOf(codes) => codes.contains(&status.code()),
            StatusExpectation::Success => status.is_success(),
        }
    }
}

/// 命名检查：只记录结果，不影响迭代流程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub expect: StatusExpectation,
}

impl Check {
    pub const fn new(name: &'static str, expect: StatusExpectation) -> Self {
        Self { name, expect }
    }

    pub fn evaluate(&self, status: Status) -> bool {
        self.expect.matches(status)
    }
}

/// 201 已创建、400 已存在，两者都算通过
pub const CREATE_TEAM: Check = Check::new(
    "create_team: 201 or 400",
    StatusExpectation::AnyOf(&[201, 400]),
);
pub const CREATE_PR: Check = Check::new("create_pr: 2xx", StatusExpectation::Success);
pub const GET_REVIEW: Check = Check::new("getReview: 200", StatusExpectation::Exact(200));
pub const GET_TEAM: Check = Check::new("getTeam: 200", StatusExpectation::Exact(200));
pub const STATS: Check = Check::new("stats: 200", StatusExpectation::Exact(200));

/// 每次迭代记录的检查，按执行顺序
pub const ALL_CHECKS: [Check; 5] = [CREATE_TEAM, CREATE_PR, GET_REVIEW, GET_TEAM, STATS];
