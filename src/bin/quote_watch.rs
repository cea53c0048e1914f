//! 行情轮询命令行
//!
//! 用法: quote-watch AAPL MSFT TSLA
//!
//! 对给定代码开启一个轮询会话，每次状态变化输出到日志，Ctrl+C 退出

use std::env;

use env_logger::Env;

use stock_quotes_backend::client::{QuotePoller, QuoteSnapshot};
use stock_quotes_backend::config::AppConfig;
use stock_quotes_backend::models::QuoteRecord;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let symbols: Vec<String> = env::args().skip(1).collect();
    if symbols.is_empty() {
        anyhow::bail!("用法: quote-watch <SYMBOL>...");
    }

    let config = AppConfig::load();
    let poller = QuotePoller::from_config(&config.poll)?;
    let mut updates = poller.subscribe();

    log::info!("行情接口: {}", config.poll.endpoint);
    poller.set_symbols(&symbols);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("收到退出信号");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                report(&snapshot);
            }
        }
    }

    poller.shutdown();
    Ok(())
}

fn report(snapshot: &QuoteSnapshot) {
    if snapshot.loading {
        log::debug!("正在刷新 {}", snapshot.symbols.join(","));
        return;
    }

    if let Some(error) = &snapshot.error {
        log::warn!("行情刷新失败（显示旧数据）: {}", error);
    }

    for record in &snapshot.stocks {
        match record {
            QuoteRecord::Quote(q) => log::info!(
                "{:<8} {:>10.2} {:>+8.2} ({:+.2}%) 成交量 {} [{}]",
                q.symbol,
                q.price,
                q.change,
                q.change_percent,
                q.volume,
                q.latest_trading_day
            ),
            QuoteRecord::Missing(m) => log::warn!("{:<8} {}", m.symbol, m.error),
        }
    }
}
