//! 股票行情服务
//!
//! 提供批量最新行情接口及其轮询客户端
//! 数据来源：Alpha Vantage GLOBAL_QUOTE

pub mod client;     // 轮询客户端
pub mod config;     // 配置
pub mod error;      // 错误类型
pub mod handlers;   // HTTP 请求处理器
pub mod middleware; // 中间件
pub mod models;     // 数据模型定义
pub mod services;   // 业务逻辑服务
