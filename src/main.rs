pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod options;
pub mod quote;
pub mod settings;
pub mod util;

use anyhow::Context;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::gateway::manager;
use crate::options::FileOptionStore;
use crate::quote::{FrinkiacClient, MokaTransientCache, QuoteProvider, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::Config::load();

    init_tracing(&cfg);

    let options = Arc::new(FileOptionStore::new(&cfg.data_dir));
    if let Err(e) = options.load().await {
        // 选项文件损坏时沿用默认设置，保存设置会覆盖它。
        tracing::warn!("加载 options.json 失败，使用默认设置: {e:#}");
    }

    let client = Arc::new(FrinkiacClient::new(&cfg).context("初始化 FrinkiacClient 失败")?);
    tracing::info!("语录来源: {}", client.url());

    let cache = Arc::new(MokaTransientCache::new(Arc::new(SystemClock)));
    let provider = Arc::new(QuoteProvider::new(client, cache, options.clone(), &cfg));

    if cfg.webui_password.is_empty() {
        tracing::warn!("未设置 WEBUI_PASSWORD，管理后台将无法登录");
    }

    let manager_state = Arc::new(manager::ManagerState {
        provider,
        options,
        webui_password: cfg.webui_password.clone(),
        session_token: util::id::session_token(),
    });

    let app = build_app(manager_state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], cfg.port)));

    tracing::info!("Server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("绑定监听端口失败")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务异常退出")?;

    Ok(())
}

fn build_app(manager_state: Arc<manager::ManagerState>) -> Router {
    // === 公开路由（不需要认证）===
    let public_routes = Router::new()
        .route("/health", get(handle_health))
        .route("/homer.css", get(manager::handle_styles))
        .route("/login", get(manager::handle_login_view))
        .route("/login", post(manager::handle_login))
        .route("/logout", get(manager::handle_logout))
        .with_state(manager_state.clone());

    // === Manager API 路由 ===
    let manager_api_routes = Router::new()
        .route("/manager/api/quote", get(manager::handle_quote))
        .route("/manager/api/footer", get(manager::handle_footer))
        .route("/manager/api/refresh", post(manager::handle_refresh))
        .route("/manager/api/settings", get(manager::handle_settings_get))
        .route("/manager/api/settings", post(manager::handle_settings_post));

    // === 页面路由 ===
    let page_routes = Router::new()
        .route("/", get(manager::handle_dashboard))
        .route("/settings", get(manager::handle_settings_page))
        .route("/settings", post(manager::handle_settings_submit));

    // 受保护路由（需要管理员登录）
    let protected_routes = Router::new()
        .merge(manager_api_routes)
        .merge(page_routes)
        .layer(middleware::from_fn_with_state(
            manager_state.clone(),
            manager::manager_auth_middleware,
        ))
        .with_state(manager_state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn handle_health() -> &'static str {
    "ok"
}

fn init_tracing(cfg: &config::Config) {
    // 依赖库默认只输出 warn；本项目日志至少 info，DEBUG 等级再决定输出哪些细节。
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let env = env.trim();
    let filter = if env.is_empty() {
        EnvFilter::new("warn,hello_homer=info")
    } else if env.contains("hello_homer") {
        EnvFilter::new(env)
    } else {
        EnvFilter::new(format!("{env},hello_homer=info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init();

    tracing::debug!(level = ?cfg.log_level(), "日志已初始化");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("收到退出信号，准备关闭服务...");
}
