//! 每个步骤的请求构造函数，输入迭代数据，输出不可变的 [`Request`]

use url::Url;

use crate::Result;
use crate::http::Request;
use crate::scenario::payload::{PullRequestPayload, TeamPayload};

pub const CREATE_TEAM: &str = "create_team";
pub const CREATE_PR: &str = "create_pr";
pub const GET_REVIEW: &str = "get_review";
pub const GET_TEAM: &str = "get_team";
pub const STATS: &str = "stats";

/// 在 base URL 的路径后追加 `path`，保留 base 自带的前缀（如 `/api`）
pub fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url
}

pub fn create_team(base: &Url, team: &TeamPayload) -> Result<Request> {
    Request::post(CREATE_TEAM, endpoint(base, "/team/add")).with_json(team)
}

pub fn create_pull_request(base: &Url, pr: &PullRequestPayload) -> Result<Request> {
    Request::post(CREATE_PR, endpoint(base, "/pullRequest/create")).with_json(pr)
}

pub fn get_review(base: &Url, user_id: &str) -> Request {
    Request::get(GET_REVIEW, endpoint(base, "/users/getReview")).with_query("user_id", user_id)
}

pub fn get_team(base: &Url, team_name: &str) -> Request {
    Request::get(GET_TEAM, endpoint(base, "/team/get")).with_query("team_name", team_name)
}

pub fn get_stats(base: &Url) -> Request {
    Request::get(STATS, endpoint(base, "/stats"))
}
