//! 股票行情数据模型
//!
//! 定义批量行情接口的请求与返回结构

use serde::{Deserialize, Serialize};

/// 单只股票的最新行情
///
/// 对应行情源 GLOBAL_QUOTE 接口的一条快照
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    /// 股票代码
    pub symbol: String,
    /// 最新价
    pub price: f64,
    /// 涨跌额
    pub change: f64,
    /// 涨跌幅（百分比数值，不带 % 号）
    pub change_percent: f64,
    /// 成交量
    pub volume: u64,
    /// 最近交易日
    pub latest_trading_day: String,
}

/// 无数据标记
///
/// 行情源没有该代码数据时，用它代替完整行情
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuoteErrorMarker {
    /// 股票代码
    pub symbol: String,
    /// 错误原因
    pub error: String,
}

/// 批量结果中的一条记录：完整行情或无数据标记
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum QuoteRecord {
    Quote(StockQuote),
    Missing(QuoteErrorMarker),
}

impl QuoteRecord {
    pub fn missing(symbol: &str, error: impl Into<String>) -> Self {
        Self::Missing(QuoteErrorMarker {
            symbol: symbol.to_string(),
            error: error.into(),
        })
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Quote(q) => &q.symbol,
            Self::Missing(m) => &m.symbol,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    pub fn as_quote(&self) -> Option<&StockQuote> {
        match self {
            Self::Quote(q) => Some(q),
            Self::Missing(_) => None,
        }
    }
}

/// 批量行情请求体
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuoteRequest {
    /// 股票代码列表
    pub symbols: Vec<String>,
}

/// 批量行情返回体
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct QuoteBatch {
    pub stocks: Vec<QuoteRecord>,
}

impl QuoteBatch {
    /// 无数据标记的数量
    pub fn error_count(&self) -> usize {
        self.stocks.iter().filter(|r| r.is_error()).count()
    }
}
