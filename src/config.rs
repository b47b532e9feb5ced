use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub user_agent: String,
    pub page_timeout: Duration,
    pub media_timeout: Duration,
    pub insecure_ssl: bool,
    pub require_instagram_host: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            media_timeout: Duration::from_secs(DEFAULT_MEDIA_TIMEOUT_SECS),
            insecure_ssl: false,
            require_instagram_host: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind: non_empty("IGMEDIA_BIND").unwrap_or(defaults.bind),
            user_agent: non_empty("IGMEDIA_USER_AGENT").unwrap_or(defaults.user_agent),
            page_timeout: seconds(
                non_empty("IGMEDIA_PAGE_TIMEOUT_SECS"),
                "IGMEDIA_PAGE_TIMEOUT_SECS",
                defaults.page_timeout,
            ),
            media_timeout: seconds(
                non_empty("IGMEDIA_MEDIA_TIMEOUT_SECS"),
                "IGMEDIA_MEDIA_TIMEOUT_SECS",
                defaults.media_timeout,
            ),
            insecure_ssl: lookup("IGMEDIA_INSECURE_SSL").as_deref() == Some("1"),
            require_instagram_host: lookup("IGMEDIA_ALLOW_ANY_HOST").as_deref() != Some("1"),
        }
    }
}

fn seconds(value: Option<String>, key: &str, default: Duration) -> Duration {
    let Some(value) = value else {
        return default;
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            tracing::warn!(key, value = %value, "ignoring invalid timeout, using {:?}", default);
            default
        }
    }
}
