use std::time::Duration;

use tracing::{debug, trace};
use url::Url;

use crate::Result;
use crate::config::LoadConfig;
use crate::http::{Client, Request};
use crate::runner::{IterationId, Metrics, Scenario};
use crate::scenario::check::{self, Check};
use crate::scenario::payload::{PullRequestPayload, TeamPayload};
use crate::scenario::steps;

/// 团队 / PR / 评审服务的七步迭代脚本
///
/// 1. 构造团队数据
/// 2. `POST /team/add`
/// 3. `POST /pullRequest/create`，作者为第一个成员
/// 4. 固定等待 `pacing`
/// 5. `GET /users/getReview`，查询第二个成员
/// 6. `GET /team/get`
/// 7. `GET /stats`
///
/// 任何一步失败都只记录结果，继续执行下一步。
#[derive(Clone)]
pub struct ReviewWorkload {
    client: Client,
    base_url: Url,
    pacing: Duration,
}

impl ReviewWorkload {
    pub fn new(client: Client, base_url: Url, pacing: Duration) -> Self {
        Self {
            client,
            base_url,
            pacing,
        }
    }

    pub fn from_config(config: &LoadConfig) -> Result<Self> {
        Ok(Self::new(
            Client::new(config.request_timeout)?,
            config.parsed_base_url()?,
            config.pacing,
        ))
    }

    /// 发送请求并记录检查；网络失败计为传输错误，不记录检查
    async fn send(&self, request: Result<Request>, name: &str, check: Check, metrics: &Metrics) {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                debug!("Failed to build {} request: {}", name, e);
                metrics.record_transport_error(name);
                return;
            }
        };

        match self.client.execute(&request).await {
            Ok(response) => {
                metrics.record_response(request.name, response.duration);
                let passed = check.evaluate(response.status);
                if !passed {
                    trace!(
                        "{} {} -> {} failed check '{}'",
                        request.method,
                        request.url,
                        response.status,
                        check.name
                    );
                }
                metrics.record_check(check.name, passed);
            }
            Err(e) => {
                debug!("{} {} transport error: {}", request.method, request.url, e);
                metrics.record_transport_error(request.name);
            }
        }
    }
}

impl Scenario for ReviewWorkload {
    async fn run_iteration(&self, id: IterationId, metrics: &Metrics) {
        let team = TeamPayload::for_iteration(id);
        self.send(
            steps::create_team(&self.base_url, &team),
            steps::CREATE_TEAM,
            check::CREATE_TEAM,
            metrics,
        )
        .await;

        let pr = PullRequestPayload::for_iteration(id, &team);
        self.send(
            steps::create_pull_request(&self.base_url, &pr),
            steps::CREATE_PR,
            check::CREATE_PR,
            metrics,
        )
        .await;

        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }

        self.send(
            Ok(steps::get_review(&self.base_url, &team.reviewer().user_id)),
            steps::GET_REVIEW,
            check::GET_REVIEW,
            metrics,
        )
        .await;

        self.send(
            Ok(steps::get_team(&self.base_url, &team.team_name)),
            steps::GET_TEAM,
            check::GET_TEAM,
            metrics,
        )
        .await;

        self.send(
            Ok(steps::get_stats(&self.base_url)),
            steps::STATS,
            check::STATS,
            metrics,
        )
        .await;
    }
}
