//! 业务逻辑服务模块
//!
//! 封装数据获取和处理逻辑

pub mod alpha_vantage;  // Alpha Vantage 行情接口
pub mod quote_fetcher;  // 批量行情服务

pub use alpha_vantage::AlphaVantageClient;
pub use quote_fetcher::QuoteFetcher;
