//! 语录提供者：先查缓存，未命中再拉取远端并写回缓存。
//!
//! 注意 `get_quote` 虽是"读"操作，未命中时会写共享缓存。
//! 获取失败只返回兜底语录，绝不写入缓存，下一次调用会立即重试。

use std::sync::Arc;

use crate::config::Config;
use crate::logging::LogLevel;
use crate::options::OptionStore;
use crate::quote::cache::{QUOTE_CACHE_KEY, TransientCache};
use crate::quote::client::{QuoteApi, QuoteError};
use crate::quote::types::{Quote, RandomResponse};
use crate::settings::Settings;

/// 一次取语录的结果。边界处统一压平为 [`Quote`]。
#[derive(Debug)]
pub enum QuoteResult {
    Cached(Quote),
    Fetched(Quote),
    Fallback(QuoteError),
}

impl QuoteResult {
    pub fn source(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::Fetched(_) => "fetched",
            Self::Fallback(_) => "fallback",
        }
    }

    pub fn into_quote(self) -> Quote {
        match self {
            Self::Cached(q) | Self::Fetched(q) => q,
            Self::Fallback(_) => Quote::fallback(),
        }
    }
}

pub struct QuoteProvider {
    api: Arc<dyn QuoteApi>,
    cache: Arc<dyn TransientCache>,
    options: Arc<dyn OptionStore>,
    image_host: String,
    log_level: LogLevel,
}

impl QuoteProvider {
    pub fn new(
        api: Arc<dyn QuoteApi>,
        cache: Arc<dyn TransientCache>,
        options: Arc<dyn OptionStore>,
        cfg: &Config,
    ) -> Self {
        Self {
            api,
            cache,
            options,
            image_host: cfg.image_host.clone(),
            log_level: cfg.log_level(),
        }
    }

    /// 取当前语录，从不失败。
    pub async fn get_quote(&self) -> Quote {
        self.resolve().await.into_quote()
    }

    pub async fn resolve(&self) -> QuoteResult {
        if let Some(quote) = self.cache.get(QUOTE_CACHE_KEY) {
            if self.log_level.quote_enabled() {
                tracing::info!(key = QUOTE_CACHE_KEY, "语录缓存命中");
            }
            return QuoteResult::Cached(quote);
        }

        match self.fetch().await {
            Ok(quote) => {
                let ttl = Settings::load(self.options.as_ref())
                    .cache_duration
                    .as_duration();
                self.cache.set(QUOTE_CACHE_KEY, quote.clone(), ttl);
                if self.log_level.quote_enabled() {
                    tracing::info!(
                        episode = %quote.episode_title,
                        ttl_secs = ttl.as_secs(),
                        "已拉取新语录并写入缓存"
                    );
                }
                QuoteResult::Fetched(quote)
            }
            Err(e) => {
                if e.is_payload() {
                    tracing::warn!(error = %e, "Frinkiac 响应内容不可用，使用兜底语录");
                } else {
                    tracing::warn!(
                        error = %e,
                        status = ?e.status(),
                        "Frinkiac 请求失败，使用兜底语录"
                    );
                }
                QuoteResult::Fallback(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Quote, QuoteError> {
        let body = self.api.fetch_random().await?;
        let resp: RandomResponse = sonic_rs::from_slice(&body)?;
        resp.into_quote(&self.image_host)
    }

    /// 手动刷新：只删除缓存，下一次 `get_quote` 会重新拉取。
    pub fn refresh(&self) -> bool {
        let deleted = self.cache.delete(QUOTE_CACHE_KEY);
        tracing::info!(deleted, "已清除语录缓存");
        deleted
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::quote::cache::{ManualClock, MokaTransientCache};
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub const TRILOGY_BODY: &str = r#"{"Episode":{"Title":"Trilogy of Error","Season":12,"Key":"S12E09"},"Subtitles":[{"Content":"D'oh!"}],"Frame":{"Timestamp":54321}}"#;

    pub enum Canned {
        Body(&'static str),
        Status(u16),
    }

    /// 按顺序返回预置响应，耗尽后重复最后一个。
    pub struct FakeApi {
        responses: Mutex<VecDeque<Canned>>,
        last: Mutex<Option<Canned>>,
        calls: AtomicUsize,
    }

    impl FakeApi {
        pub fn new(responses: Vec<Canned>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<Vec<u8>, QuoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut last = self.last.lock().unwrap();
            if let Some(c) = self.responses.lock().unwrap().pop_front() {
                *last = Some(c);
            }
            match last.as_ref() {
                Some(Canned::Body(b)) => Ok(b.as_bytes().to_vec()),
                Some(Canned::Status(s)) => Err(QuoteError::Http {
                    status: *s,
                    message: "canned".to_string(),
                }),
                None => Err(QuoteError::Http {
                    status: 599,
                    message: "no canned response".to_string(),
                }),
            }
        }
    }

    impl QuoteApi for FakeApi {
        fn fetch_random(&self) -> BoxFuture<'_, Result<Vec<u8>, QuoteError>> {
            futures::future::ready(self.next()).boxed()
        }
    }

    pub fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            quote_api_url: "http://127.0.0.1:9/api/random".to_string(),
            image_host: "frinkiac.com".to_string(),
            api_user_agent: "hello-homer-test".to_string(),
            timeout_ms: 0,
            proxy: String::new(),
            debug: "low".to_string(),
            data_dir: String::new(),
            webui_password: "pw".to_string(),
        }
    }

    pub struct Harness {
        pub provider: QuoteProvider,
        pub api: Arc<FakeApi>,
        pub clock: Arc<ManualClock>,
        pub cache: Arc<MokaTransientCache>,
    }

    pub fn harness(responses: Vec<Canned>, options: Arc<dyn OptionStore>) -> Harness {
        let api = Arc::new(FakeApi::new(responses));
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(MokaTransientCache::new(clock.clone()));
        let provider = QuoteProvider::new(api.clone(), cache.clone(), options, &test_config());
        Harness {
            provider,
            api,
            clock,
            cache,
        }
    }
}
