//! HTML 模板渲染模块。
//!
//! 使用 askama 模板引擎，模板文件位于 templates/，输出时统一 HTML 转义。

use askama::Template;

use crate::quote::Quote;
use crate::settings::{CacheDuration, Settings};

/// 缓存时长下拉选项
#[derive(Debug, Clone)]
pub struct DurationOption {
    pub value: u64,
    pub label: &'static str,
    pub selected: bool,
}

pub fn duration_options(current: CacheDuration) -> Vec<DurationOption> {
    CacheDuration::ALL
        .into_iter()
        .map(|d| DurationOption {
            value: d.as_secs(),
            label: d.label(),
            selected: d == current,
        })
        .collect()
}

// ============================================================================
// 模板结构体（使用 askama）
// ============================================================================

/// 页脚语录片段
#[derive(Template)]
#[template(path = "fragments/footer.html")]
pub struct FooterTemplate<'a> {
    pub quote: &'a Quote,
    pub show_image: bool,
    pub show_episode: bool,
}

/// 渲染页脚语录。只依赖两个输入，无副作用。
pub fn render_footer(quote: &Quote, settings: &Settings) -> String {
    let tmpl = FooterTemplate {
        quote,
        show_image: settings.show_image,
        show_episode: settings.show_episode,
    };
    match tmpl.render() {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(error = %e, "页脚模板渲染失败，输出空页脚");
            String::new()
        }
    }
}

/// 登录页面模板
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error_msg: String,
}

/// Dashboard 页面模板
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub footer_html: String,
    pub cache_label: &'static str,
}

/// 设置页面模板
#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsPageTemplate {
    pub settings: Settings,
    pub durations: Vec<DurationOption>,
    pub updated: bool,
    pub footer_html: String,
}
