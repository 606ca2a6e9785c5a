pub mod browser;
pub mod domain;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod sites;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub mod config {
    use std::time::Duration;

    pub const DEFAULT_OUTPUT_PATH: &str = "output.sheets";
    pub const DEFAULT_ELEMENT_TIMEOUT_MS: u64 = 10_000;
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CATEGORY_DELAY_SECS: u64 = 30;
    pub const DEFAULT_USER_AGENT: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    pub const DEFAULT_YAHOO_BASE_URL: &str = "https://finance.yahoo.com";
    pub const DEFAULT_ZACKS_BASE_URL: &str = "https://www.zacks.com";
    pub const DEFAULT_ALPHASPREAD_BASE_URL: &str = "https://www.alphaspread.com";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub output_path: String,
        pub element_timeout: Duration,
        pub request_timeout: Duration,
        pub category_delay: Duration,
        pub user_agent: String,
        pub yahoo_base_url: String,
        pub zacks_base_url: String,
        pub alphaspread_base_url: String,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                sentry_dsn: None,
                output_path: DEFAULT_OUTPUT_PATH.to_string(),
                element_timeout: Duration::from_millis(DEFAULT_ELEMENT_TIMEOUT_MS),
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                category_delay: Duration::from_secs(DEFAULT_CATEGORY_DELAY_SECS),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
                zacks_base_url: DEFAULT_ZACKS_BASE_URL.to_string(),
                alphaspread_base_url: DEFAULT_ALPHASPREAD_BASE_URL.to_string(),
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();

            let element_timeout_ms = env_parse::<u64>("SCRAPE_ELEMENT_TIMEOUT_MS")
                .unwrap_or(DEFAULT_ELEMENT_TIMEOUT_MS);
            let request_timeout_secs = env_parse::<u64>("SCRAPE_REQUEST_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
            let category_delay_secs =
                env_parse::<u64>("CATEGORY_DELAY_SECS").unwrap_or(DEFAULT_CATEGORY_DELAY_SECS);

            anyhow::ensure!(
                element_timeout_ms > 0,
                "SCRAPE_ELEMENT_TIMEOUT_MS must be > 0"
            );

            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                output_path: env_non_empty("REPORT_OUTPUT_PATH").unwrap_or(defaults.output_path),
                element_timeout: Duration::from_millis(element_timeout_ms),
                request_timeout: Duration::from_secs(request_timeout_secs),
                category_delay: Duration::from_secs(category_delay_secs),
                user_agent: env_non_empty("SCRAPE_USER_AGENT").unwrap_or(defaults.user_agent),
                yahoo_base_url: env_non_empty("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
                zacks_base_url: env_non_empty("ZACKS_BASE_URL").unwrap_or(defaults.zacks_base_url),
                alphaspread_base_url: env_non_empty("ALPHASPREAD_BASE_URL")
                    .unwrap_or(defaults.alphaspread_base_url),
            })
        }
    }

    fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

    fn env_non_empty(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
