use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8046;
const DEFAULT_USER_AGENT: &str = "hello-homer/0.1";

pub const DEFAULT_QUOTE_API_URL: &str = "https://frinkiac.com/api/random";
pub const DEFAULT_IMAGE_HOST: &str = "frinkiac.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub quote_api_url: String,
    pub image_host: String,
    pub api_user_agent: String,
    /// 0 表示不单独设置超时，沿用 HTTP 客户端默认行为。
    pub timeout_ms: u64,
    pub proxy: String,

    pub debug: String,

    pub data_dir: String,
    pub webui_password: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawEnv {
    #[serde(alias = "HOST")]
    host: Option<String>,
    #[serde(alias = "PORT")]
    port: Option<u16>,

    #[serde(alias = "QUOTE_API_URL")]
    quote_api_url: Option<String>,
    #[serde(alias = "IMAGE_HOST")]
    image_host: Option<String>,
    #[serde(alias = "API_USER_AGENT")]
    api_user_agent: Option<String>,
    #[serde(alias = "TIMEOUT")]
    timeout: Option<u64>,
    #[serde(alias = "PROXY")]
    proxy: Option<String>,

    #[serde(alias = "DEBUG")]
    debug: Option<String>,

    #[serde(alias = "DATA_DIR")]
    data_dir: Option<String>,
    #[serde(alias = "WEBUI_PASSWORD")]
    webui_password: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        load_dotenv();

        let raw = Figment::from(Env::raw())
            .extract::<RawEnv>()
            .unwrap_or_default();

        let mut cfg = Self::from_raw(raw);

        // 命令行覆盖：-debug <level>
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            if arg == "-debug"
                && let Some(v) = args.next()
            {
                cfg.debug = v;
            }
        }

        cfg
    }

    fn from_raw(raw: RawEnv) -> Self {
        Self {
            host: non_empty(raw.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: raw.port.unwrap_or(DEFAULT_PORT),
            quote_api_url: non_empty(raw.quote_api_url)
                .unwrap_or_else(|| DEFAULT_QUOTE_API_URL.to_string()),
            image_host: non_empty(raw.image_host)
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_IMAGE_HOST.to_string()),
            api_user_agent: non_empty(raw.api_user_agent)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout_ms: raw.timeout.unwrap_or(0),
            proxy: raw.proxy.unwrap_or_default(),
            debug: raw.debug.unwrap_or_else(|| "off".to_string()),
            data_dir: non_empty(raw.data_dir).unwrap_or_else(|| "./data".to_string()),
            webui_password: raw.webui_password.unwrap_or_default(),
        }
    }

    pub fn log_level(&self) -> crate::logging::LogLevel {
        crate::logging::LogLevel::parse(&self.debug)
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn load_dotenv() {
    let Some(dotenv_path) = find_dotenv_path() else {
        return;
    };

    let Ok(file) = std::fs::File::open(&dotenv_path) else {
        return;
    };

    let reader = std::io::BufReader::new(file);
    for line in std::io::BufRead::lines(reader).map_while(Result::ok) {
        let Some((key, value)) = parse_dotenv_line(&line) else {
            continue;
        };
        // 已存在的进程环境变量优先于 .env。
        if std::env::var_os(&key).is_some() {
            continue;
        }
        // Rust 2024：set_var 为 unsafe。此处仅在启动阶段、尚未启动其他线程时调用。
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

fn find_dotenv_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let mut dir: &Path = cwd.as_path();

    loop {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            return Some(candidate);
        }

        // 不越过仓库根目录。
        if dir.join("Cargo.toml").is_file() || dir.join(".git").is_dir() {
            return None;
        }

        let parent = dir.parent()?;
        if parent == dir {
            return None;
        }
        dir = parent;
    }
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let mut line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("export ") {
        line = rest.trim_start();
    }

    let (key, raw) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let raw = raw.trim();
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some((key.to_string(), raw[1..raw.len() - 1].to_string()));
        }
    }

    Some((key.to_string(), strip_inline_comment(raw).to_string()))
}

fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'#' {
            continue;
        }
        if i == 0 || bytes[i - 1] == b' ' || bytes[i - 1] == b'\t' {
            return value[..i].trim_end();
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dotenv_line_handles_quotes_and_comments() {
        assert_eq!(
            parse_dotenv_line("PORT=9000"),
            Some(("PORT".to_string(), "9000".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("export DEBUG=low # 调试"),
            Some(("DEBUG".to_string(), "low".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("WEBUI_PASSWORD=\"pass # word\""),
            Some(("WEBUI_PASSWORD".to_string(), "pass # word".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("IMAGE_HOST=img#1"),
            Some(("IMAGE_HOST".to_string(), "img#1".to_string()))
        );
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line("=value"), None);
        assert_eq!(parse_dotenv_line("   "), None);
    }

    #[test]
    fn from_raw_applies_defaults() {
        let cfg = Config::from_raw(RawEnv::default());
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.quote_api_url, DEFAULT_QUOTE_API_URL);
        assert_eq!(cfg.image_host, DEFAULT_IMAGE_HOST);
        assert_eq!(cfg.timeout_ms, 0);
        assert_eq!(cfg.debug, "off");
        assert_eq!(cfg.data_dir, "./data");
    }

    #[test]
    fn from_raw_trims_image_host_and_ignores_blank_values() {
        let cfg = Config::from_raw(RawEnv {
            image_host: Some("cdn.example.com/".to_string()),
            quote_api_url: Some("   ".to_string()),
            ..RawEnv::default()
        });
        assert_eq!(cfg.image_host, "cdn.example.com");
        assert_eq!(cfg.quote_api_url, DEFAULT_QUOTE_API_URL);
    }
}
