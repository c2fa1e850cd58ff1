use crate::config::Config;
use crate::logging;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Frinkiac API 错误 {status}: {message}")]
    Http { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] sonic_rs::Error),

    #[error("响应缺少字段: {0}")]
    MissingField(&'static str),
}

impl QuoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 响应已拿到但内容不可用（与传输层失败区分，仅用于日志）。
    pub fn is_payload(&self) -> bool {
        matches!(self, Self::Json(_) | Self::MissingField(_))
    }
}

/// 远端语录源。返回原始响应体，由调用方解析。
pub trait QuoteApi: Send + Sync {
    fn fetch_random(&self) -> BoxFuture<'_, Result<Vec<u8>, QuoteError>>;
}

#[derive(Debug, Clone)]
pub struct FrinkiacClient {
    http: reqwest::Client,
    url: String,
    user_agent: String,
    log_level: logging::LogLevel,
}

impl FrinkiacClient {
    pub fn new(cfg: &Config) -> Result<Self, anyhow::Error> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90));

        // 未配置时不设置超时，沿用 reqwest 默认。
        if cfg.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(cfg.timeout_ms));
        }

        if !cfg.proxy.trim().is_empty() {
            builder = builder.proxy(reqwest::Proxy::all(cfg.proxy.trim())?);
        }

        Ok(Self {
            http: builder.build()?,
            url: cfg.quote_api_url.clone(),
            user_agent: cfg.api_user_agent.clone(),
            log_level: cfg.log_level(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or(HeaderValue::from_static("hello-homer")),
        );
        h.insert(ACCEPT, HeaderValue::from_static("application/json"));
        h
    }

    /// GET 一次随机语录。非 2xx 视为失败，不重试。
    pub async fn random(&self) -> Result<Vec<u8>, QuoteError> {
        let headers = self.build_headers();
        if self.log_level.backend_enabled() {
            logging::backend_request("GET", &self.url, &headers);
        }

        let start = std::time::Instant::now();
        let resp = self.http.get(&self.url).headers(headers).send().await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if self.log_level.backend_enabled() {
            if self.log_level.raw_enabled() {
                logging::backend_response_raw(status.as_u16(), start.elapsed(), &bytes);
            } else {
                logging::backend_response(status.as_u16(), start.elapsed(), &bytes);
            }
        }

        if !status.is_success() {
            return Err(QuoteError::Http {
                status: status.as_u16(),
                message: error_message(status, &bytes),
            });
        }
        Ok(bytes.to_vec())
    }
}

impl QuoteApi for FrinkiacClient {
    fn fetch_random(&self) -> BoxFuture<'_, Result<Vec<u8>, QuoteError>> {
        self.random().boxed()
    }
}

fn error_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    const MAX_CHARS: usize = 200;
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return status.canonical_reason().unwrap_or("unknown").to_string();
    }
    text.chars().take(MAX_CHARS).collect()
}
