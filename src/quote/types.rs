use serde::{Deserialize, Serialize};

use crate::quote::client::QuoteError;
use crate::quote::sanitize::{sanitize_path_segment, sanitize_text};

pub const FALLBACK_TEXT: &str = "D'oh! We couldn't connect to the API!";

/// 一条可展示的语录。
///
/// 要么是远端拉取的真实语录（正文与剧集标题都非空），
/// 要么是兜底语录（固定文案，其余字段为空）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub text: String,
    pub episode_title: String,
    pub season: Option<u32>,
    pub image_url: String,
}

impl Quote {
    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_TEXT.to_string(),
            episode_title: String::new(),
            season: None,
            image_url: String::new(),
        }
    }

    #[cfg(test)]
    pub fn is_fallback(&self) -> bool {
        self.episode_title.is_empty()
    }
}

// ============================================================================
// Frinkiac /api/random 响应
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RandomResponse {
    #[serde(default)]
    pub episode: Option<Episode>,
    #[serde(default)]
    pub subtitles: Option<Vec<Subtitle>>,
    #[serde(default)]
    pub frame: Option<Frame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Episode {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subtitle {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Frame {
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl RandomResponse {
    /// 转为语录。剧集标题与第一条字幕缺一不可；
    /// 剧集 key 或帧时间戳缺失时不生成图片地址。
    pub fn into_quote(self, image_host: &str) -> Result<Quote, QuoteError> {
        let episode = self.episode.ok_or(QuoteError::MissingField("Episode"))?;

        let episode_title = episode
            .title
            .as_deref()
            .map(sanitize_text)
            .filter(|t| !t.is_empty())
            .ok_or(QuoteError::MissingField("Episode.Title"))?;

        let text = self
            .subtitles
            .as_deref()
            .and_then(|subs| subs.first())
            .and_then(|s| s.content.as_deref())
            .map(sanitize_text)
            .filter(|t| !t.is_empty())
            .ok_or(QuoteError::MissingField("Subtitles[0].Content"))?;

        let image_url = match (
            episode.key.as_deref().and_then(sanitize_path_segment),
            self.frame.and_then(|f| f.timestamp),
        ) {
            (Some(key), Some(ts)) if ts.is_finite() => {
                // 与 intval 一致：向零截断。
                format!("https://{image_host}/img/{key}/{}.jpg", ts.trunc() as i64)
            }
            _ => String::new(),
        };

        Ok(Quote {
            text,
            episode_title,
            season: episode.season,
            image_url,
        })
    }
}
