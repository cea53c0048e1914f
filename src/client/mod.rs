//! 行情轮询客户端
//!
//! 供界面或命令行消费批量行情接口

pub mod poller;  // 定时轮询会话
pub mod source;  // 行情数据源

pub use poller::{QuotePoller, QuoteSnapshot};
pub use source::{HttpQuoteSource, QuoteSource};
