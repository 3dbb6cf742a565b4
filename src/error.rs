use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrloadError {
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("无效的时长: {0}")]
    InvalidDuration(String),

    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("URL 解析错误: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl PrloadError {
    /// 配置类错误在任何迭代开始前终止运行
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PrloadError::ConfigError(_)
                | PrloadError::InvalidUrl(_)
                | PrloadError::InvalidDuration(_)
                | PrloadError::TomlError(_)
        )
    }

    /// 网络层错误：超时、连接被拒、DNS 失败
    pub fn is_transport(&self) -> bool {
        matches!(self, PrloadError::HttpError(_))
    }
}

impl From<anyhow::Error> for PrloadError {
    fn from(err: anyhow::Error) -> Self {
        PrloadError::Other(err.to_string())
    }
}

/// Result type for prload crate
pub type Result<T> = std::result::Result<T, PrloadError>;
