use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::types::{LoadConfig, Stage};
use crate::{PrloadError, Result};

/// 环境变量：覆盖配置文件中的 base_url
pub const BASE_URL_ENV: &str = "PRLOAD_BASE_URL";

/// CLI 层传入的覆盖项，优先级最高
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub stages: Vec<Stage>,
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "prload.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<LoadConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PrloadError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// 查找配置文件
    /// 查找顺序：
    /// 1. 当前目录及其父目录
    /// 2. 用户配置目录 ~/.config/prload/
    pub fn find_config_path() -> Option<PathBuf> {
        Self::find_in_ancestors().or_else(Self::find_in_user_dir)
    }

    fn find_in_ancestors() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    fn find_in_user_dir() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("prload").join(Self::CONFIG_FILE);
        config_path.exists().then_some(config_path)
    }

    /// 合并得到最终配置并校验
    ///
    /// 优先级：CLI 覆盖 > 环境变量 > 配置文件 > 内置默认值。
    /// 显式指定的文件读不到时直接报错，不会回退到默认值。
    pub fn resolve(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<LoadConfig> {
        let mut config = match explicit.map(Path::to_path_buf).or_else(Self::find_config_path) {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::load_from_path(&path)?
            }
            None => {
                debug!("No config file found, using built-in profile");
                LoadConfig::default()
            }
        };

        Self::apply_env(&mut config, |key| std::env::var(key).ok());
        Self::apply_overrides(&mut config, overrides);
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆盖，`lookup` 便于测试时注入
    pub fn apply_env<F>(config: &mut LoadConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("{} overrides base_url", BASE_URL_ENV);
            config.base_url = url;
        }
    }

    pub fn apply_overrides(config: &mut LoadConfig, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.base_url {
            config.base_url = url.clone();
        }
        // 与 k6 --stage 一致：只要给了就整体替换
        if !overrides.stages.is_empty() {
            config.stages = overrides.stages.clone();
        }
    }
}
