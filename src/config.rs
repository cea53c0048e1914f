//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，行情接口密钥可由环境变量覆盖

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 行情接口密钥的环境变量名
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// Alpha Vantage 行情接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphaVantageConfig {
    /// API Key（为空则请求时报配置错误）
    #[serde(default)]
    pub api_key: Option<String>,
    /// 接口地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 轮询客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// 行情批量接口地址
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// 轮询间隔（秒）
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// 单次请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 行情接口配置
    #[serde(default)]
    pub alpha_vantage: AlphaVantageConfig,
    /// 轮询配置
    #[serde(default)]
    pub poll: PollConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "https://www.alphavantage.co/query".to_string() }
fn default_endpoint() -> String { "http://127.0.0.1:8080/api/v1/stock-prices".to_string() }
fn default_interval() -> u64 { 60 }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            interval_secs: default_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AlphaVantageConfig {
    /// 返回有效的 API Key，空白字符串视为未配置
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值；最后应用环境变量覆盖
    pub fn load() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        let mut config = None;
        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(loaded) => {
                        log::info!("从 {} 加载配置成功", path);
                        config = Some(loaded);
                        break;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            log::info!("使用默认配置");
            Self::default()
        });
        config.apply_env(env::var(API_KEY_ENV).ok());
        config
    }

    /// 用环境变量中的密钥覆盖配置文件中的值
    pub fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.alpha_vantage.api_key = Some(key);
        }
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
