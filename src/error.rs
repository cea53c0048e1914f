//! 错误类型定义

use thiserror::Error;

/// 请求缺少或包含非法的代码列表
pub const MSG_SYMBOLS_REQUIRED: &str = "Symbols array is required";
/// 未配置行情接口密钥
pub const MSG_API_KEY_MISSING: &str = "API key not configured";
/// 行情源没有该代码的数据
pub const MSG_NO_DATA: &str = "No data available";
/// 行情源限流
pub const MSG_RATE_LIMITED: &str = "API rate limit reached";
/// 行情字段无法解析
pub const MSG_MALFORMED: &str = "Malformed quote data";

/// 行情获取错误
#[derive(Debug, Error)]
pub enum QuoteError {
    /// 请求格式或服务配置错误，整批请求失败
    #[error("{0}")]
    Configuration(String),

    /// 单个代码无数据，只影响该代码的记录
    #[error("{symbol}: {reason}")]
    UpstreamSymbol { symbol: String, reason: String },

    /// 客户端调用行情接口失败
    #[error("{0}")]
    Transport(String),
}

impl QuoteError {
    pub fn symbols_required() -> Self {
        Self::Configuration(MSG_SYMBOLS_REQUIRED.to_string())
    }

    pub fn api_key_missing() -> Self {
        Self::Configuration(MSG_API_KEY_MISSING.to_string())
    }

    pub fn upstream(symbol: &str, reason: impl Into<String>) -> Self {
        Self::UpstreamSymbol {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for QuoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
