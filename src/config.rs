use crate::errors::{CrawlerError, Result};
use crate::models::index::IndexCode;
use std::time::Duration;

/// 浏览器 UA，数据源会拒绝非浏览器客户端
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_FINANCE_URL: &str = "https://finance.naver.com";
pub const DEFAULT_POLLING_URL: &str = "https://polling.finance.naver.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_interval: Duration,
    pub user_agent: String,
    pub finance_base_url: String,
    pub polling_base_url: String,
    pub default_indices: Vec<IndexCode>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            data_dir: "data".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            request_interval: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            finance_base_url: DEFAULT_FINANCE_URL.to_string(),
            polling_base_url: DEFAULT_POLLING_URL.to_string(),
            default_indices: IndexCode::ALL.to_vec(),
        }
    }

    /// 以默认值为基础，应用 `FIFLOW_*` 环境变量
    pub fn from_env() -> Result<Self> {
        Self::new().with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("FIFLOW_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Some(secs) = lookup("FIFLOW_TIMEOUT_SECS") {
            self.timeout = Duration::from_secs(parse_number("FIFLOW_TIMEOUT_SECS", &secs)?);
        }
        if let Some(n) = lookup("FIFLOW_MAX_RETRIES") {
            self.max_retries = u32::try_from(parse_number("FIFLOW_MAX_RETRIES", &n)?)
                .map_err(|_| CrawlerError::Config(format!("FIFLOW_MAX_RETRIES out of range: {}", n)))?;
        }
        if let Some(ms) = lookup("FIFLOW_RETRY_DELAY_MS") {
            self.retry_delay = Duration::from_millis(parse_number("FIFLOW_RETRY_DELAY_MS", &ms)?);
        }
        if let Some(ms) = lookup("FIFLOW_REQUEST_INTERVAL_MS") {
            self.request_interval = Duration::from_millis(parse_number("FIFLOW_REQUEST_INTERVAL_MS", &ms)?);
        }
        if let Some(ua) = lookup("FIFLOW_USER_AGENT") {
            self.user_agent = ua;
        }
        if let Some(url) = lookup("FIFLOW_FINANCE_URL") {
            self.finance_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("FIFLOW_POLLING_URL") {
            self.polling_base_url = url.trim_end_matches('/').to_string();
        }
        Ok(self)
    }

    pub fn with_data_dir(mut self, dir: &str) -> Self {
        self.data_dir = dir.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_base_urls(mut self, finance: &str, polling: &str) -> Self {
        self.finance_base_url = finance.trim_end_matches('/').to_string();
        self.polling_base_url = polling.trim_end_matches('/').to_string();
        self
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| CrawlerError::Config(format!("{}={:?}: {}", name, value, e)))
}
