//! Alpha Vantage 行情接口实现
//!
//! 对接 https://www.alphavantage.co/query?function=GLOBAL_QUOTE
//! 单个代码的任何失败都降级为无数据标记，不影响同批其它代码

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::AlphaVantageConfig;
use crate::error::{QuoteError, MSG_MALFORMED, MSG_NO_DATA, MSG_RATE_LIMITED};
use crate::models::{QuoteRecord, StockQuote};

/// 最新行情接口的 function 参数
pub const GLOBAL_QUOTE_FUNCTION: &str = "GLOBAL_QUOTE";

const GLOBAL_QUOTE_KEY: &str = "Global Quote";
const FIELD_PRICE: &str = "05. price";
const FIELD_VOLUME: &str = "06. volume";
const FIELD_TRADING_DAY: &str = "07. latest trading day";
const FIELD_CHANGE: &str = "09. change";
const FIELD_CHANGE_PERCENT: &str = "10. change percent";

/// Alpha Vantage 客户端
///
/// 进程启动时创建一次，内部复用连接池
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(config: &AlphaVantageConfig) -> Result<Self, QuoteError> {
        let api_key = config
            .credential()
            .ok_or_else(QuoteError::api_key_missing)?
            .to_string();

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            QuoteError::Configuration(format!("Invalid quote provider url {}: {}", config.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| QuoteError::Configuration(format!("Failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// 构造单个代码的请求地址（代码会被 URL 编码）
    pub fn quote_url(&self, symbol: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("function", GLOBAL_QUOTE_FUNCTION)
            .append_pair("symbol", symbol)
            .append_pair("apikey", &self.api_key);
        url
    }

    /// 获取单只股票最新行情
    pub async fn global_quote(&self, symbol: &str) -> QuoteRecord {
        match self.request_global_quote(symbol).await {
            Ok(data) => parse_global_quote(symbol, &data),
            Err(e) => {
                log::warn!("获取 {} 行情失败: {}", symbol, e);
                match e {
                    QuoteError::UpstreamSymbol { reason, .. } => QuoteRecord::missing(symbol, reason),
                    other => QuoteRecord::missing(symbol, other.to_string()),
                }
            }
        }
    }

    async fn request_global_quote(&self, symbol: &str) -> Result<Value, QuoteError> {
        let response = self
            .client
            .get(self.quote_url(symbol))
            .send()
            .await
            .map_err(|e| QuoteError::upstream(symbol, format!("Upstream request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(QuoteError::upstream(
                symbol,
                format!("Upstream returned {}", response.status()),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| QuoteError::upstream(symbol, format!("Invalid upstream response: {}", e.without_url())))
    }
}

/// 解析 GLOBAL_QUOTE 返回数据
///
/// 数值字段任一无法解析时整条记录降级为无数据标记
pub fn parse_global_quote(symbol: &str, data: &Value) -> QuoteRecord {
    match extract_quote(symbol, data) {
        Ok(quote) => QuoteRecord::Quote(quote),
        Err(QuoteError::UpstreamSymbol { reason, .. }) => QuoteRecord::missing(symbol, reason),
        Err(other) => QuoteRecord::missing(symbol, other.to_string()),
    }
}

fn extract_quote(symbol: &str, data: &Value) -> Result<StockQuote, QuoteError> {
    // 格式: {"Global Quote": {"01. symbol": "IBM", "05. price": "168.9100", "10. change percent": "0.6853%", ...}}
    let quote = data
        .get(GLOBAL_QUOTE_KEY)
        .and_then(Value::as_object)
        .filter(|q| !q.is_empty());

    let Some(quote) = quote else {
        // 限流时返回 {"Note": "..."} 或 {"Information": "..."}
        if data.get("Note").is_some() || data.get("Information").is_some() {
            return Err(QuoteError::upstream(symbol, MSG_RATE_LIMITED));
        }
        return Err(QuoteError::upstream(symbol, MSG_NO_DATA));
    };

    let field = |key: &str| quote.get(key).and_then(Value::as_str);
    let malformed = || QuoteError::upstream(symbol, MSG_MALFORMED);

    let price = field(FIELD_PRICE).and_then(parse_decimal).ok_or_else(malformed)?;
    let change = field(FIELD_CHANGE).and_then(parse_decimal).ok_or_else(malformed)?;
    let change_percent = field(FIELD_CHANGE_PERCENT)
        .and_then(parse_change_percent)
        .ok_or_else(malformed)?;
    let volume = field(FIELD_VOLUME)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(malformed)?;
    let latest_trading_day = field(FIELD_TRADING_DAY).ok_or_else(malformed)?.to_string();

    Ok(StockQuote {
        symbol: symbol.to_string(),
        price,
        change,
        change_percent,
        volume,
        latest_trading_day,
    })
}

fn parse_decimal(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 解析涨跌幅字符串，如 "3.25%" 或 "-1.50%"
pub fn parse_change_percent(s: &str) -> Option<f64> {
    let s = s.trim();
    parse_decimal(s.strip_suffix('%').unwrap_or(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ibm_payload() -> Value {
        json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "02. open": "167.5000",
                "05. price": "168.9100",
                "06. volume": "3245678",
                "07. latest trading day": "2024-05-10",
                "08. previous close": "167.7600",
                "09. change": "1.1500",
                "10. change percent": "0.6855%"
            }
        })
    }

    fn test_config(base_url: String) -> AlphaVantageConfig {
        AlphaVantageConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            ..AlphaVantageConfig::default()
        }
    }

    #[test]
    fn test_parse_change_percent() {
        assert_eq!(parse_change_percent("3.25%"), Some(3.25));
        assert_eq!(parse_change_percent("-1.50%"), Some(-1.5));
        assert_eq!(parse_change_percent(" 0.6855% "), Some(0.6855));
        assert_eq!(parse_change_percent("2"), Some(2.0));
        assert_eq!(parse_change_percent("%"), None);
        assert_eq!(parse_change_percent("NaN%"), None);
    }

    #[test]
    fn test_parse_full_quote() {
        let record = parse_global_quote("IBM", &ibm_payload());
        let quote = record.as_quote().expect("应为完整行情");
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.price, 168.91);
        assert_eq!(quote.change, 1.15);
        assert_eq!(quote.change_percent, 0.6855);
        assert_eq!(quote.volume, 3_245_678);
        assert_eq!(quote.latest_trading_day, "2024-05-10");
    }

    #[test]
    fn test_unknown_symbol_is_marker() {
        let record = parse_global_quote("ZZZZ", &json!({"Global Quote": {}}));
        assert_eq!(record, QuoteRecord::missing("ZZZZ", MSG_NO_DATA));

        let record = parse_global_quote("ZZZZ", &json!({"Error Message": "Invalid API call."}));
        assert_eq!(record, QuoteRecord::missing("ZZZZ", MSG_NO_DATA));
    }

    #[test]
    fn test_rate_limit_note_is_marker() {
        let record = parse_global_quote(
            "AAPL",
            &json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}),
        );
        assert_eq!(record, QuoteRecord::missing("AAPL", MSG_RATE_LIMITED));

        let record = parse_global_quote("AAPL", &json!({"Information": "rate limit"}));
        assert_eq!(record, QuoteRecord::missing("AAPL", MSG_RATE_LIMITED));
    }

    #[test]
    fn test_partial_numeric_fields_never_leak() {
        let mut payload = ibm_payload();
        payload["Global Quote"]["06. volume"] = json!("12.5");
        let record = parse_global_quote("IBM", &payload);
        assert_eq!(record, QuoteRecord::missing("IBM", MSG_MALFORMED));

        let mut payload = ibm_payload();
        payload["Global Quote"]
            .as_object_mut()
            .unwrap()
            .remove("05. price");
        assert!(parse_global_quote("IBM", &payload).is_error());
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let config = AlphaVantageConfig::default();
        let err = AlphaVantageClient::new(&config).unwrap_err();
        assert!(matches!(err, QuoteError::Configuration(ref m) if m == "API key not configured"));
    }

    #[test]
    fn test_quote_url_encodes_symbol() {
        let client = AlphaVantageClient::new(&test_config("https://www.alphavantage.co/query".to_string())).unwrap();
        let url = client.quote_url("BRK B");
        assert_eq!(
            url.as_str(),
            "https://www.alphavantage.co/query?function=GLOBAL_QUOTE&symbol=BRK+B&apikey=test-key"
        );
    }

    #[tokio::test]
    async fn test_global_quote_against_mock_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .and(query_param("symbol", "IBM"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ibm_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let client = AlphaVantageClient::new(&test_config(format!("{}/query", server.uri()))).unwrap();
        let record = client.global_quote("IBM").await;
        assert_eq!(record.as_quote().map(|q| q.volume), Some(3_245_678));
    }

    #[tokio::test]
    async fn test_upstream_http_error_becomes_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = AlphaVantageClient::new(&test_config(format!("{}/query", server.uri()))).unwrap();
        let record = client.global_quote("AAPL").await;
        match record {
            QuoteRecord::Missing(marker) => {
                assert_eq!(marker.symbol, "AAPL");
                assert!(marker.error.contains("503"), "错误信息: {}", marker.error);
            }
            other => panic!("应为无数据标记: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_becomes_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = AlphaVantageClient::new(&test_config(format!("{}/query", server.uri()))).unwrap();
        assert!(client.global_quote("AAPL").await.is_error());
    }
}
