//! 股票行情接口处理器
//!
//! - POST /stock-prices - 批量获取最新行情，请求体 `{ "symbols": [...] }`

use actix_web::{web, HttpResponse, Result};
use futures::StreamExt;
use crate::error::QuoteError;
use crate::models::ErrorBody;
use crate::services::QuoteFetcher;

/// 请求体大小上限
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// 读取请求体，超限或读取失败时返回配置错误
async fn read_body(mut payload: web::Payload) -> Result<web::BytesMut, QuoteError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|e| QuoteError::Configuration(format!("Invalid request body: {}", e)))?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(QuoteError::Configuration("Request body too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// 批量获取股票最新行情
///
/// POST /api/v1/stock-prices
///
/// 请求体按原始字节读取，格式错误或超限同样返回 500 `{ "error": ... }`
pub async fn get_stock_prices(
    fetcher: web::Data<QuoteFetcher>,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let result = match read_body(payload).await {
        Ok(body) => fetcher.handle(&body).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(batch) => {
            log::info!(
                "返回 {} 条行情，其中 {} 条无数据",
                batch.stocks.len(),
                batch.error_count()
            );
            Ok(HttpResponse::Ok().json(batch))
        }
        Err(e) => {
            log::error!("获取股票行情失败: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorBody::new(e.to_string())))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/stock-prices", web::post().to(get_stock_prices));
}
