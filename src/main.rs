//! 股票行情后端服务
//!
//! 提供批量最新行情的 HTTP 接口，支持浏览器跨域直接调用
//! 数据来源：Alpha Vantage

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use stock_quotes_backend::config::AppConfig;
use stock_quotes_backend::handlers;
use stock_quotes_backend::middleware::CorsMiddleware;
use stock_quotes_backend::services::QuoteFetcher;

/// 应用程序入口
///
/// 启动 HTTP 服务器，监听地址由配置决定（默认 0.0.0.0:8080）
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统，默认日志级别为 info
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::load();
    let fetcher = web::Data::new(QuoteFetcher::new(&config.alpha_vantage)?);

    log::info!("启动股票行情服务，监听 {}", config.bind_addr());

    // 创建并启动 HTTP 服务器
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(CorsMiddleware)  // 跨域处理（包括预检请求）
            .wrap(Logger::default())  // 添加请求日志中间件
            .app_data(fetcher.clone())
            .configure(handlers::config)  // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(config.bind_addr())?.run().await?;
    Ok(())
}
