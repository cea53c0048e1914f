//! 行情数据源
//!
//! 轮询客户端通过 [`QuoteSource`] 调用批量行情接口

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::PollConfig;
use crate::error::QuoteError;
use crate::models::{ErrorBody, QuoteBatch, QuoteRecord, QuoteRequest};

/// 批量行情数据源
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<QuoteRecord>, QuoteError>;
}

/// 通过 HTTP 调用批量行情接口
#[derive(Debug, Clone)]
pub struct HttpQuoteSource {
    client: Client,
    endpoint: String,
}

impl HttpQuoteSource {
    pub fn new(config: &PollConfig) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<QuoteRecord>, QuoteError> {
        let request = QuoteRequest {
            symbols: symbols.to_vec(),
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            // 服务端错误体为 {"error": "..."}，解析失败时退回状态码
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("Failed to fetch prices: {}", status),
            };
            return Err(QuoteError::Transport(message));
        }

        let batch: QuoteBatch = response.json().await?;
        Ok(batch.stocks)
    }
}
