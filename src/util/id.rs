use uuid::Uuid;

/// 管理后台会话令牌，每个进程生成一次。
pub fn session_token() -> String {
    format!("homer-{}", Uuid::new_v4().simple())
}
