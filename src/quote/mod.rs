//! 语录获取：Frinkiac 客户端、瞬态缓存与提供者。

pub mod cache;
pub mod client;
pub mod provider;
pub mod sanitize;
pub mod types;

pub use cache::{MokaTransientCache, QUOTE_CACHE_KEY, SystemClock, TransientCache};
pub use client::{FrinkiacClient, QuoteApi, QuoteError};
pub use provider::{QuoteProvider, QuoteResult};
pub use types::Quote;
