//! 管理页面处理器：Dashboard、设置页、语录片段与手动刷新。

use axum::{
    Form, Json,
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::gateway::manager::templates::{self, duration_options};
use crate::options::OptionStore;
use crate::quote::{Quote, QuoteProvider, QuoteResult};
use crate::settings::{Settings, SettingsForm};

use askama::Template;

/// 注入到管理后台 head 的样式
pub const HOMER_CSS: &str = include_str!("../../../assets/homer.css");

/// Manager 应用状态
pub struct ManagerState {
    pub provider: Arc<QuoteProvider>,
    pub options: Arc<dyn OptionStore>,
    pub webui_password: String,
    /// 本进程的会话令牌，重启后旧 Cookie 失效
    pub session_token: String,
}

impl ManagerState {
    fn settings(&self) -> Settings {
        Settings::load(self.options.as_ref())
    }

    async fn footer_html(&self) -> String {
        let quote = self.provider.get_quote().await;
        templates::render_footer(&quote, &self.settings())
    }
}

/// Cookie 名称
const SESSION_COOKIE_NAME: &str = "hello_homer_session";

// ============================================================================
// 认证相关
// ============================================================================

/// 检查请求是否携带本进程的会话 Cookie
fn is_authenticated(headers: &HeaderMap, token: &str) -> bool {
    let expected = format!("{SESSION_COOKIE_NAME}={token}");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .any(|c| c.trim() == expected)
}

fn set_auth_cookie(token: &str) -> String {
    let expires = chrono::Utc::now() + chrono::Duration::hours(24);
    let expires_str = expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Expires={expires_str}")
}

fn clear_auth_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; Max-Age=0")
}

/// 管理员权限检查：API 路径返回 401，页面跳转登录
pub async fn manager_auth_middleware(
    State(state): State<Arc<ManagerState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if is_authenticated(&headers, &state.session_token) {
        return next.run(request).await;
    }

    if request.uri().path().starts_with("/manager/api") {
        return AppError::unauthorized("未登录或会话已过期，请先登录管理面板").into_response();
    }

    Redirect::to("/login").into_response()
}

// ============================================================================
// 登录/登出处理器
// ============================================================================

/// GET /login
pub async fn handle_login_view(
    State(state): State<Arc<ManagerState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if is_authenticated(&headers, &state.session_token) {
        return Ok(Redirect::to("/").into_response());
    }

    let tmpl = templates::LoginTemplate {
        error_msg: String::new(),
    };
    Ok(Html(tmpl.render()?).into_response())
}

/// 登录表单
#[derive(Deserialize)]
pub struct LoginForm {
    password: String,
}

/// POST /login
pub async fn handle_login(
    State(state): State<Arc<ManagerState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let error_msg = if state.webui_password.is_empty() {
        "管理密码未配置，请设置 WEBUI_PASSWORD 环境变量"
    } else if form.password == state.webui_password {
        let cookie = set_auth_cookie(&state.session_token);
        return Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response());
    } else {
        tracing::warn!("管理后台登录失败：密码错误");
        "密码错误"
    };

    let tmpl = templates::LoginTemplate {
        error_msg: error_msg.to_string(),
    };
    Ok((StatusCode::UNAUTHORIZED, Html(tmpl.render()?)).into_response())
}

/// GET /logout
pub async fn handle_logout() -> Response {
    ([(header::SET_COOKIE, clear_auth_cookie())], Redirect::to("/login")).into_response()
}

// ============================================================================
// 页面
// ============================================================================

/// GET / - Dashboard，页脚带语录
pub async fn handle_dashboard(
    State(state): State<Arc<ManagerState>>,
) -> Result<Html<String>, AppError> {
    let tmpl = templates::DashboardTemplate {
        footer_html: state.footer_html().await,
        cache_label: state.settings().cache_duration.label(),
    };
    Ok(Html(tmpl.render()?))
}

/// GET /homer.css
pub async fn handle_styles() -> Response {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], HOMER_CSS).into_response()
}

#[derive(Deserialize, Default)]
pub struct SettingsPageQuery {
    #[serde(default)]
    updated: Option<String>,
}

/// GET /settings - 设置页
pub async fn handle_settings_page(
    State(state): State<Arc<ManagerState>>,
    Query(query): Query<SettingsPageQuery>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings();
    let tmpl = templates::SettingsPageTemplate {
        settings,
        durations: duration_options(settings.cache_duration),
        updated: query.updated.as_deref() == Some("true"),
        footer_html: state.footer_html().await,
    };
    Ok(Html(tmpl.render()?))
}

/// POST /settings - 表单提交
pub async fn handle_settings_submit(
    State(state): State<Arc<ManagerState>>,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, AppError> {
    save_settings(&state, &form).await?;
    Ok(Redirect::to("/settings?updated=true"))
}

async fn save_settings(state: &ManagerState, form: &SettingsForm) -> Result<Settings, AppError> {
    let settings = form.validate().map_err(AppError::bad_request)?;
    state.options.update_options(&settings.to_options()).await?;
    tracing::info!(
        show_image = settings.show_image,
        show_episode = settings.show_episode,
        cache_secs = settings.cache_duration.as_secs(),
        "设置已更新"
    );
    Ok(settings)
}

// ============================================================================
// Manager API
// ============================================================================

/// 语录 API 响应
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteApiResponse {
    pub quote: Quote,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /manager/api/quote
pub async fn handle_quote(State(state): State<Arc<ManagerState>>) -> Json<QuoteApiResponse> {
    let result = state.provider.resolve().await;
    let source = result.source();
    let error = match &result {
        QuoteResult::Fallback(e) => Some(e.to_string()),
        _ => None,
    };
    Json(QuoteApiResponse {
        quote: result.into_quote(),
        source,
        error,
    })
}

/// GET /manager/api/footer - 页脚片段
pub async fn handle_footer(State(state): State<Arc<ManagerState>>) -> Html<String> {
    Html(state.footer_html().await)
}

/// POST /manager/api/refresh - 清除缓存，无响应体
pub async fn handle_refresh(State(state): State<Arc<ManagerState>>) -> StatusCode {
    state.provider.refresh();
    StatusCode::NO_CONTENT
}

/// GET /manager/api/settings
pub async fn handle_settings_get(State(state): State<Arc<ManagerState>>) -> Json<SettingsForm> {
    Json(SettingsForm::from_settings(&state.settings()))
}

/// 设置保存响应
#[derive(Serialize)]
struct SettingsResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<SettingsForm>,
}

/// POST /manager/api/settings
pub async fn handle_settings_post(
    State(state): State<Arc<ManagerState>>,
    Json(req): Json<SettingsForm>,
) -> Result<Response, AppError> {
    let settings = save_settings(&state, &req).await?;
    Ok(Json(SettingsResponse {
        success: true,
        settings: Some(SettingsForm::from_settings(&settings)),
    })
    .into_response())
}
