/// 清理远端文本：去掉控制字符，空白折叠为单个空格，首尾去空。
///
/// HTML 转义不在这里做，统一交给模板输出时转义，避免二次转义。
pub fn sanitize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if ch.is_control() {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

/// 图片路径片段（剧集 key），非空时做 URL 编码。
pub fn sanitize_path_segment(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Some(urlencoding::encode(s).into_owned())
}
