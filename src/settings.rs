//! 显示设置。
//!
//! 每次渲染都从选项存储重新读取，设置页保存后立即生效。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::options::OptionStore;

pub const OPTION_SHOW_IMAGE: &str = "hello_homer_show_image";
pub const OPTION_SHOW_EPISODE: &str = "hello_homer_show_episode";
pub const OPTION_CACHE_TIME: &str = "hello_homer_cache_time";

const HOUR_IN_SECONDS: u64 = 60 * 60;
const DAY_IN_SECONDS: u64 = 24 * HOUR_IN_SECONDS;
const WEEK_IN_SECONDS: u64 = 7 * DAY_IN_SECONDS;

/// 语录缓存时长，只允许三档。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheDuration {
    #[default]
    Hour,
    Day,
    Week,
}

impl CacheDuration {
    pub const ALL: [CacheDuration; 3] = [Self::Hour, Self::Day, Self::Week];

    pub fn as_secs(self) -> u64 {
        match self {
            Self::Hour => HOUR_IN_SECONDS,
            Self::Day => DAY_IN_SECONDS,
            Self::Week => WEEK_IN_SECONDS,
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    pub fn from_secs(secs: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_secs() == secs)
    }

    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<u64>().ok().and_then(Self::from_secs)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Hour => "1 Hour",
            Self::Day => "1 Day",
            Self::Week => "1 Week",
        }
    }
}

/// 当前生效的显示设置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub show_image: bool,
    pub show_episode: bool,
    pub cache_duration: CacheDuration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_image: true,
            show_episode: true,
            cache_duration: CacheDuration::Hour,
        }
    }
}

impl Settings {
    /// 从选项存储读取；缺失或非法值回落到默认值。
    pub fn load(store: &dyn OptionStore) -> Self {
        let defaults = Self::default();
        Self {
            show_image: store
                .get_option(OPTION_SHOW_IMAGE)
                .and_then(|v| parse_yes_no(&v))
                .unwrap_or(defaults.show_image),
            show_episode: store
                .get_option(OPTION_SHOW_EPISODE)
                .and_then(|v| parse_yes_no(&v))
                .unwrap_or(defaults.show_episode),
            cache_duration: store
                .get_option(OPTION_CACHE_TIME)
                .and_then(|v| CacheDuration::parse(&v))
                .unwrap_or(defaults.cache_duration),
        }
    }

    /// 写回选项存储所需的键值对。
    pub fn to_options(&self) -> [(&'static str, String); 3] {
        [
            (OPTION_SHOW_IMAGE, yes_no(self.show_image).to_string()),
            (OPTION_SHOW_EPISODE, yes_no(self.show_episode).to_string()),
            (OPTION_CACHE_TIME, self.cache_duration.as_secs().to_string()),
        ]
    }
}

/// 设置表单（HTML 表单与 JSON 共用，字段名即选项键）。
///
/// 缺失字段按空串处理，交给 `validate` 统一报 400。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsForm {
    #[serde(rename = "hello_homer_show_image", default)]
    pub show_image: String,
    #[serde(rename = "hello_homer_show_episode", default)]
    pub show_episode: String,
    #[serde(rename = "hello_homer_cache_time", default)]
    pub cache_time: String,
}

impl SettingsForm {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            show_image: yes_no(settings.show_image).to_string(),
            show_episode: yes_no(settings.show_episode).to_string(),
            cache_time: settings.cache_duration.as_secs().to_string(),
        }
    }

    pub fn validate(&self) -> Result<Settings, &'static str> {
        let show_image = parse_yes_no(&self.show_image).ok_or("Show Screenshot 必须是 yes 或 no")?;
        let show_episode =
            parse_yes_no(&self.show_episode).ok_or("Show Episode Info 必须是 yes 或 no")?;
        let cache_duration = CacheDuration::parse(&self.cache_time)
            .ok_or("Cache Duration 必须是 3600、86400 或 604800")?;
        Ok(Settings {
            show_image,
            show_episode,
            cache_duration,
        })
    }
}

fn parse_yes_no(value: &str) -> Option<bool> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if v.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::MemoryOptionStore;

    #[test]
    fn defaults_when_store_is_empty() {
        let store = MemoryOptionStore::default();
        assert_eq!(Settings::load(&store), Settings::default());
        assert_eq!(Settings::default().cache_duration.as_secs(), 3600);
    }

    #[test]
    fn load_reads_stored_values() {
        let store = MemoryOptionStore::with(&[
            (OPTION_SHOW_IMAGE, "no"),
            (OPTION_SHOW_EPISODE, "YES"),
            (OPTION_CACHE_TIME, "604800"),
        ]);
        let s = Settings::load(&store);
        assert!(!s.show_image);
        assert!(s.show_episode);
        assert_eq!(s.cache_duration, CacheDuration::Week);
    }

    #[test]
    fn load_falls_back_on_invalid_values() {
        let store = MemoryOptionStore::with(&[
            (OPTION_SHOW_IMAGE, "maybe"),
            (OPTION_CACHE_TIME, "42"),
        ]);
        let s = Settings::load(&store);
        assert!(s.show_image);
        assert_eq!(s.cache_duration, CacheDuration::Hour);
    }

    #[test]
    fn cache_duration_accepts_only_three_values() {
        assert_eq!(CacheDuration::parse("3600"), Some(CacheDuration::Hour));
        assert_eq!(CacheDuration::parse(" 86400 "), Some(CacheDuration::Day));
        assert_eq!(CacheDuration::parse("604800"), Some(CacheDuration::Week));
        assert_eq!(CacheDuration::parse("7200"), None);
        assert_eq!(CacheDuration::parse("-1"), None);
        assert_eq!(CacheDuration::parse(""), None);
    }

    #[test]
    fn form_validation() {
        let form = SettingsForm {
            show_image: "no".to_string(),
            show_episode: "yes".to_string(),
            cache_time: "86400".to_string(),
        };
        let s = form.validate().unwrap();
        assert!(!s.show_image);
        assert!(s.show_episode);
        assert_eq!(s.cache_duration, CacheDuration::Day);

        let mut bad = form.clone();
        bad.cache_time = "100".to_string();
        assert!(bad.validate().is_err());

        let mut bad = form;
        bad.show_episode = "on".to_string();
        assert!(bad.validate().is_err());

        assert!(SettingsForm::default().validate().is_err());
    }

    #[test]
    fn to_options_uses_store_format() {
        let s = Settings {
            show_image: false,
            show_episode: true,
            cache_duration: CacheDuration::Week,
        };
        let opts = s.to_options();
        assert_eq!(opts[0], (OPTION_SHOW_IMAGE, "no".to_string()));
        assert_eq!(opts[2], (OPTION_CACHE_TIME, "604800".to_string()));
        assert_eq!(SettingsForm::from_settings(&s).validate().unwrap(), s);
    }
}
