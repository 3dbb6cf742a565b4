use crate::http::types::Status;
use std::time::Duration;

/// 压测只关心状态码与耗时，响应体读取后即丢弃
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub duration: Duration,
}

impl Response {
    pub fn new(status: impl Into<Status>, duration: Duration) -> Self {
        Self {
            status: status.into(),
            duration,
        }
    }
}
