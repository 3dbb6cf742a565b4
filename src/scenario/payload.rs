use serde::{Deserialize, Serialize};

use crate::runner::IterationId;

/// 每个团队的成员数
pub const TEAM_SIZE: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// `POST /team/add` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPayload {
    pub team_name: String,
    pub members: Vec<Member>,
}

impl TeamPayload {
    /// 由迭代身份确定性生成：`team-<vu>-<iter>`，成员 `u-<vu>-<iter>-<n>`，第三个成员不活跃
    pub fn for_iteration(id: IterationId) -> Self {
        let members = (1..=TEAM_SIZE)
            .map(|n| Member {
                user_id: format!("u-{}-{}", id, n),
                username: format!("user-{}-{}", id, n),
                is_active: n != TEAM_SIZE,
            })
            .collect();

        Self {
            team_name: format!("team-{}", id),
            members,
        }
    }

    /// PR 作者：第一个成员
    pub fn author(&self) -> &Member {
        &self.members[0]
    }

    /// 查询待评审列表的用户：第二个成员
    pub fn reviewer(&self) -> &Member {
        &self.members[1]
    }
}

/// `POST /pullRequest/create` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestPayload {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

impl PullRequestPayload {
    pub fn for_iteration(id: IterationId, team: &TeamPayload) -> Self {
        Self {
            pull_request_id: format!("pr-{}", id),
            pull_request_name: format!("PR {}", id),
            author_id: team.author().user_id.clone(),
        }
    }
}
