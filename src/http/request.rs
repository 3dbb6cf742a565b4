use reqwest::header::{CONTENT_TYPE, HeaderMap as Headers, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::Result;
use crate::http::types::Method;

/// 不可变的请求描述
///
/// 由各步骤的构造函数生成，交给 [`Client::execute`](crate::http::Client::execute) 执行。
/// `name` 用作延迟统计和传输错误计数的分组键。
#[derive(Debug, Clone)]
pub struct Request {
    pub name: &'static str,
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(name: &'static str, method: Method, url: Url) -> Self {
        Self {
            name,
            method,
            url,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn get(name: &'static str, url: Url) -> Self {
        Self::new(name, Method::Get, url)
    }

    pub fn post(name: &'static str, url: Url) -> Self {
        Self::new(name, Method::Post, url)
    }

    pub fn with_json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        let json = serde_json::to_vec(data)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(json);
        Ok(self)
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// 请求体按 JSON 解析（测试与调试用）
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}
