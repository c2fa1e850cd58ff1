//! 管理后台模块。
//!
//! - 登录/登出（管理员权限检查）
//! - Dashboard 页脚语录
//! - 设置页与手动刷新

pub mod handler;
pub mod templates;

pub use handler::*;
