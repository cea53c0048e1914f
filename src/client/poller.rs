//! 行情轮询客户端
//!
//! 维护一个关注列表，列表非空时立即拉取一次，之后按固定间隔刷新。
//!
//! ## 状态
//! - `stocks`: 最近一次成功的批量结果（失败时保留旧数据）
//! - `loading`: 当前列表是否有请求在途
//! - `error`: 最近一次失败原因，下次成功时清空
//!
//! ## 并发
//! 每次更换列表都会取消旧的定时任务并开启新一代会话。
//! 每次请求带上 (会话代数, 序号)，代数不一致或序号落后的结果直接丢弃，
//! 因此旧列表的迟到响应不会覆盖新列表的状态。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::source::{HttpQuoteSource, QuoteSource};
use crate::config::PollConfig;
use crate::error::QuoteError;
use crate::models::QuoteRecord;

/// 默认刷新间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// 最小刷新间隔，与 `PollConfig::interval` 一致
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 对外暴露的轮询状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    /// 当前关注列表
    pub symbols: Vec<String>,
    /// 最近一次成功的批量结果
    pub stocks: Vec<QuoteRecord>,
    /// 是否有请求在途
    pub loading: bool,
    /// 最近一次失败原因
    pub error: Option<String>,
    /// 最近一次成功时间
    pub updated_at: Option<DateTime<Utc>>,
}

/// 会话簿记，只在锁内修改
#[derive(Debug, Default)]
struct Session {
    symbols: Vec<String>,
    generation: u64,
    next_seq: u64,
    applied_seq: u64,
    in_flight: usize,
    cancel: Option<CancellationToken>,
}

#[derive(Debug)]
struct FetchTicket {
    generation: u64,
    seq: u64,
    symbols: Vec<String>,
}

struct Shared {
    source: Arc<dyn QuoteSource>,
    session: Mutex<Session>,
    tx: watch::Sender<QuoteSnapshot>,
}

impl Shared {
    /// 登记一次请求；列表为空或会话已过期时返回 None
    fn begin_fetch(&self, generation: Option<u64>) -> Option<FetchTicket> {
        let mut session = self.session.lock();
        if session.symbols.is_empty() {
            return None;
        }
        if generation.is_some_and(|g| g != session.generation) {
            return None;
        }

        session.next_seq += 1;
        session.in_flight += 1;
        let ticket = FetchTicket {
            generation: session.generation,
            seq: session.next_seq,
            symbols: session.symbols.clone(),
        };
        self.tx.send_if_modified(|snapshot| !std::mem::replace(&mut snapshot.loading, true));
        Some(ticket)
    }

    /// 应用请求结果，过期结果直接丢弃
    fn finish_fetch(&self, ticket: FetchTicket, result: Result<Vec<QuoteRecord>, QuoteError>) {
        let mut session = self.session.lock();
        if ticket.generation != session.generation {
            log::debug!(
                "丢弃过期的行情结果: {}（第 {} 代，当前第 {} 代）",
                ticket.symbols.join(","),
                ticket.generation,
                session.generation
            );
            return;
        }

        session.in_flight = session.in_flight.saturating_sub(1);
        let apply = ticket.seq > session.applied_seq;
        if apply {
            session.applied_seq = ticket.seq;
        } else {
            log::debug!("丢弃落后的行情结果，序号 {}", ticket.seq);
        }
        let loading = session.in_flight > 0;

        self.tx.send_modify(|snapshot| {
            if apply {
                match result {
                    Ok(stocks) => {
                        snapshot.stocks = stocks;
                        snapshot.error = None;
                        snapshot.updated_at = Some(Utc::now());
                    }
                    Err(e) => {
                        snapshot.error = Some(e.to_string());
                    }
                }
            }
            snapshot.loading = loading;
        });
    }

    async fn run_fetch(&self, generation: Option<u64>) {
        let Some(ticket) = self.begin_fetch(generation) else {
            return;
        };

        let result = self.source.fetch(&ticket.symbols).await;
        match &result {
            Ok(stocks) => log::debug!("获取 {} 条行情", stocks.len()),
            Err(e) => log::warn!("获取股票行情失败: {}", e),
        }
        self.finish_fetch(ticket, result);
    }
}

/// 行情轮询客户端
///
/// 需在 tokio 运行时内使用；销毁时取消定时任务
pub struct QuotePoller {
    shared: Arc<Shared>,
    interval: Duration,
}

impl QuotePoller {
    /// 间隔小于 [`MIN_POLL_INTERVAL`] 时按最小间隔处理
    pub fn new(source: Arc<dyn QuoteSource>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(QuoteSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                source,
                session: Mutex::new(Session::default()),
                tx,
            }),
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// 使用 HTTP 数据源创建
    pub fn from_config(config: &PollConfig) -> Result<Self, QuoteError> {
        let source = HttpQuoteSource::new(config)?;
        Ok(Self::new(Arc::new(source), config.interval()))
    }

    /// 更换关注列表
    ///
    /// 内容不变时不做任何事；否则取消旧任务，列表非空时立即拉取并按间隔刷新
    pub fn set_symbols<I, S>(&self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = normalize_symbols(symbols);

        let mut session = self.shared.session.lock();
        if session.symbols == symbols {
            return;
        }

        if let Some(cancel) = session.cancel.take() {
            cancel.cancel();
        }
        session.generation += 1;
        session.in_flight = 0;
        session.symbols = symbols.clone();
        let generation = session.generation;

        self.shared.tx.send_modify(|snapshot| {
            snapshot.symbols = symbols.clone();
            snapshot.loading = false;
        });

        if symbols.is_empty() {
            log::info!("关注列表为空，停止轮询");
            return;
        }

        let cancel = CancellationToken::new();
        session.cancel = Some(cancel.clone());
        drop(session);

        log::info!("开始轮询 {}，间隔 {:?}", symbols.join(","), self.interval);
        tokio::spawn(poll_loop(self.shared.clone(), generation, self.interval, cancel));
    }

    /// 手动刷新，成功/失败处理与定时刷新一致
    pub async fn refresh(&self) {
        self.shared.run_fetch(None).await;
    }

    /// 当前状态
    pub fn snapshot(&self) -> QuoteSnapshot {
        self.shared.tx.borrow().clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<QuoteSnapshot> {
        self.shared.tx.subscribe()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.shared.session.lock().symbols.clone()
    }

    /// 取消定时任务，在途请求的结果会被丢弃
    pub fn shutdown(&self) {
        let mut session = self.shared.session.lock();
        if let Some(cancel) = session.cancel.take() {
            cancel.cancel();
        }
        session.generation += 1;
        session.in_flight = 0;
        self.shared.tx.send_if_modified(|snapshot| std::mem::replace(&mut snapshot.loading, false));
    }
}

impl Drop for QuotePoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_loop(shared: Arc<Shared>, generation: u64, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                log::debug!("第 {} 代轮询任务已取消", generation);
                break;
            }
            _ = ticker.tick() => {
                shared.run_fetch(Some(generation)).await;
            }
        }
    }
}

/// 规范化关注列表：去除空白、空项和重复项，保留首次出现的顺序
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for symbol in symbols {
        let symbol = symbol.as_ref().trim();
        if !symbol.is_empty() && !out.iter().any(|s| s == symbol) {
            out.push(symbol.to_string());
        }
    }
    out
}
