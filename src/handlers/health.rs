use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use crate::models::ApiResponse;
use crate::services::QuoteFetcher;

/// 健康状态
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// 行情接口密钥是否已配置
    pub provider_configured: bool,
}

pub async fn health_check(fetcher: web::Data<QuoteFetcher>) -> Result<HttpResponse> {
    let response = ApiResponse::success(HealthStatus {
        status: "Service is healthy".to_string(),
        provider_configured: fetcher.is_configured(),
    });
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
