use std::time::{Duration, Instant};

use crate::Result;
use crate::http::request::Request;
use crate::http::response::Response;

/// 所有 VU 共享的 HTTP 客户端
///
/// `reqwest::Client` 内部是 `Arc`，clone 只复制句柄，连接池共享。
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            inner: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// 执行请求并测量耗时（含读取响应体）
    ///
    /// 任何状态码都返回 `Ok`，只有网络层失败才返回错误。
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        let mut req = self
            .inner
            .request(request.method.into(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let start = Instant::now();
        let response = req.send().await?;
        let status = response.status();
        response.bytes().await?;
        let duration = start.elapsed();

        Ok(Response::new(status, duration))
    }
}
