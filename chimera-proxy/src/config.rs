//! 代理配置
//!
//! 从 TOML 加载，可以用环境变量覆盖：
//!
//! ```toml
//! [proxy]
//! default_answer = "fail"
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//! ```

use crate::logging::LoggingConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// 环境变量：覆盖 `proxy.default_answer`
pub const DEFAULT_ANSWER_ENV: &str = "CHIMERA_PROXY_DEFAULT_ANSWER";

/// 无目标 mock 上未匹配任何通知的调用如何应答
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAnswer {
    /// 返回按声明返回类型合成的默认值
    #[default]
    ReturnDefaults,
    /// 严格模式：抛出 `ProxyError::Unstubbed`
    Fail,
}

impl FromStr for DefaultAnswer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "return_defaults" | "defaults" => Ok(DefaultAnswer::ReturnDefaults),
            "fail" | "strict" => Ok(DefaultAnswer::Fail),
            _ => Err(format!("Invalid default answer: {}", s)),
        }
    }
}

/// 代理行为配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub default_answer: DefaultAnswer,
}

impl ProxySettings {
    /// 严格 mock
    pub fn strict() -> Self {
        Self {
            default_answer: DefaultAnswer::Fail,
        }
    }
}

/// 全部配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub proxy: ProxySettings,
    pub logging: LoggingConfig,
}

impl Settings {
    /// 从 TOML 字符串加载，缺失的字段取默认值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse proxy settings")
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    /// 默认配置叠加环境变量
    pub fn from_env() -> Result<Self> {
        Self::default().overlay_env()
    }

    /// 用环境变量覆盖当前配置
    ///
    /// `CHIMERA_PROXY_DEFAULT_ANSWER` 的值无效时报错；日志相关变量的无效值被忽略。
    pub fn overlay_env(mut self) -> Result<Self> {
        if let Ok(answer) = std::env::var(DEFAULT_ANSWER_ENV) {
            self.proxy.default_answer = answer
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid value in {}", DEFAULT_ANSWER_ENV))?;
        }
        self.logging = self.logging.overlay_env();
        Ok(self)
    }
}
