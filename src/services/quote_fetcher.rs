//! 批量行情服务
//!
//! 校验请求中的代码列表，并发请求每只股票的最新行情，
//! 全部完成后按请求顺序合并为一批返回

use futures::future::join_all;
use serde_json::Value;

use crate::config::AlphaVantageConfig;
use crate::error::QuoteError;
use crate::models::QuoteBatch;
use crate::services::alpha_vantage::AlphaVantageClient;

/// 批量行情服务
pub struct QuoteFetcher {
    /// 未配置密钥时为空，请求时返回配置错误
    provider: Option<AlphaVantageClient>,
}

impl QuoteFetcher {
    pub fn new(config: &AlphaVantageConfig) -> Result<Self, QuoteError> {
        let provider = match config.credential() {
            Some(_) => Some(AlphaVantageClient::new(config)?),
            None => {
                log::warn!("未设置 {} ，行情请求将返回配置错误", crate::config::API_KEY_ENV);
                None
            }
        };
        Ok(Self { provider })
    }

    pub fn with_provider(provider: AlphaVantageClient) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// 处理一次批量请求
    ///
    /// 依次执行：解析请求体、校验代码列表、检查密钥、并发拉取
    pub async fn handle(&self, body: &[u8]) -> Result<QuoteBatch, QuoteError> {
        let request: Value = serde_json::from_slice(body)
            .map_err(|e| QuoteError::Configuration(format!("Invalid request body: {}", e)))?;
        let symbols = parse_symbols(&request)?;
        let provider = self.provider.as_ref().ok_or_else(QuoteError::api_key_missing)?;

        Ok(fetch_batch(provider, &symbols).await)
    }
}

/// 校验并提取请求中的代码列表
///
/// 缺失、非数组、空数组或包含非字符串/空白元素时报错；代码与重复项原样保留
pub fn parse_symbols(request: &Value) -> Result<Vec<String>, QuoteError> {
    let items = request
        .get("symbols")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(QuoteError::symbols_required)?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(QuoteError::symbols_required)
        })
        .collect()
}

/// 并发获取一批代码的行情
///
/// 每个代码一次上游请求，单个失败只产生该代码的无数据标记
pub async fn fetch_batch(provider: &AlphaVantageClient, symbols: &[String]) -> QuoteBatch {
    log::info!("获取 {} 只股票行情", symbols.len());

    let stocks = join_all(symbols.iter().map(|symbol| provider.global_quote(symbol))).await;
    let batch = QuoteBatch { stocks };

    let errors = batch.error_count();
    if errors > 0 {
        log::debug!("本批 {} 只股票无数据", errors);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MSG_API_KEY_MISSING, MSG_NO_DATA, MSG_SYMBOLS_REQUIRED};
    use crate::models::QuoteRecord;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quote_payload(price: &str, percent: &str) -> Value {
        json!({
            "Global Quote": {
                "05. price": price,
                "06. volume": "1000",
                "07. latest trading day": "2024-05-10",
                "09. change": "1.0000",
                "10. change percent": percent
            }
        })
    }

    async fn mock_provider() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_payload("189.5000", "0.5300%")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("symbol", "MSFT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_payload("410.2000", "-1.50%")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("symbol", "ZZZZ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Global Quote": {}})))
            .mount(&server)
            .await;
        server
    }

    fn fetcher_for(server: &MockServer, api_key: Option<&str>) -> QuoteFetcher {
        let config = AlphaVantageConfig {
            api_key: api_key.map(str::to_string),
            base_url: format!("{}/query", server.uri()),
            ..AlphaVantageConfig::default()
        };
        QuoteFetcher::new(&config).unwrap()
    }

    fn assert_configuration(err: QuoteError, expected: &str) {
        match err {
            QuoteError::Configuration(message) => assert!(
                message.starts_with(expected),
                "错误信息 {} 应以 {} 开头",
                message,
                expected
            ),
            other => panic!("应为配置错误: {:?}", other),
        }
    }

    #[test]
    fn test_parse_symbols_rejects_bad_shapes() {
        let bad = vec![
            json!({}),
            json!({"symbols": null}),
            json!({"symbols": "AAPL"}),
            json!({"symbols": []}),
            json!({"symbols": ["AAPL", 42]}),
            json!({"symbols": ["AAPL", "  "]}),
        ];
        for request in bad {
            let err = parse_symbols(&request).unwrap_err();
            assert_configuration(err, MSG_SYMBOLS_REQUIRED);
        }
    }

    #[test]
    fn test_parse_symbols_keeps_duplicates_and_order() {
        let symbols = parse_symbols(&json!({"symbols": ["MSFT", " AAPL ", "MSFT"]})).unwrap();
        assert_eq!(symbols, vec!["MSFT", " AAPL ", "MSFT"]);
    }

    #[tokio::test]
    async fn test_batch_has_one_record_per_symbol() {
        let server = mock_provider().await;
        let fetcher = fetcher_for(&server, Some("test-key"));

        let body = json!({"symbols": ["AAPL", "ZZZZ", "MSFT", "AAPL"]}).to_string();
        let batch = fetcher.handle(body.as_bytes()).await.unwrap();

        assert_eq!(batch.stocks.len(), 4);
        let symbols: Vec<&str> = batch.stocks.iter().map(QuoteRecord::symbol).collect();
        assert_eq!(symbols, vec!["AAPL", "ZZZZ", "MSFT", "AAPL"]);
        assert_eq!(batch.stocks[1], QuoteRecord::missing("ZZZZ", MSG_NO_DATA));
        assert_eq!(batch.stocks[2].as_quote().map(|q| q.change_percent), Some(-1.5));
        assert_eq!(batch.error_count(), 1);

        // 重复代码不去重，每个元素一次上游请求
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 4);
    }

    #[tokio::test]
    async fn test_record_symbol_echoes_request() {
        let server = mock_provider().await;
        let fetcher = fetcher_for(&server, Some("test-key"));

        let body = json!({"symbols": ["aapl", " MSFT"]}).to_string();
        let batch = fetcher.handle(body.as_bytes()).await.unwrap();
        let symbols: Vec<&str> = batch.stocks.iter().map(QuoteRecord::symbol).collect();
        assert_eq!(symbols, vec!["aapl", " MSFT"]);
    }

    #[tokio::test]
    async fn test_all_unknown_is_still_a_batch() {
        let server = mock_provider().await;
        let fetcher = fetcher_for(&server, Some("test-key"));

        let body = json!({"symbols": ["ZZZZ"]}).to_string();
        let batch = fetcher.handle(body.as_bytes()).await.unwrap();
        assert_eq!(batch.stocks, vec![QuoteRecord::missing("ZZZZ", MSG_NO_DATA)]);
    }

    #[tokio::test]
    async fn test_invalid_symbols_never_reach_upstream() {
        let server = mock_provider().await;
        let fetcher = fetcher_for(&server, Some("test-key"));

        for body in [r#"{"symbols": []}"#, r#"{"symbols": "AAPL"}"#, r#"{}"#] {
            let err = fetcher.handle(body.as_bytes()).await.unwrap_err();
            assert_configuration(err, MSG_SYMBOLS_REQUIRED);
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_never_reaches_upstream() {
        let server = mock_provider().await;
        let fetcher = fetcher_for(&server, None);

        let body = json!({"symbols": ["AAPL"]}).to_string();
        let err = fetcher.handle(body.as_bytes()).await.unwrap_err();
        assert_configuration(err, MSG_API_KEY_MISSING);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_configuration_error() {
        let server = mock_provider().await;
        let fetcher = fetcher_for(&server, Some("test-key"));

        let err = fetcher.handle(b"{not json").await.unwrap_err();
        assert_configuration(err, "Invalid request body");
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
