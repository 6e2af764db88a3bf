use crate::config::Config;
use crate::errors::{CrawlerError, Result};
use crate::scrapers::base::{classify_status, fetch_with_retries, AttemptOutcome, FetchRequest, PageFetcher, StatusClass};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::Client;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::Mutex;

/// 基于 reqwest 的抓取器：浏览器 UA、超时、请求间隔、有限次重试
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| CrawlerError::Config(format!("invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(CrawlerError::RequestError)?;

        Ok(Self {
            client,
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            request_interval: config.request_interval,
            last_request: Mutex::new(None),
        })
    }

    /// 等待请求频率限制
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(instant) = *last {
            let elapsed = instant.elapsed();
            if elapsed < self.request_interval {
                let wait_time = self.request_interval - elapsed;
                debug!("Waiting {:?} for rate limit", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn attempt(&self, request: &FetchRequest) -> AttemptOutcome {
        self.wait_for_rate_limit().await;

        let mut builder = self.client.get(&request.url);
        if let Some(referer) = &request.referer {
            builder = builder.header("Referer", referer);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return classify_request_error(&e),
        };

        let status = response.status();
        match classify_status(status.as_u16()) {
            StatusClass::Success => match response.text().await {
                Ok(body) => AttemptOutcome::Success(body),
                Err(e) => classify_request_error(&e),
            },
            StatusClass::Transient => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| parse_retry_after(v, SystemTime::now()))
                    .map(|wait| wait.min(self.timeout));
                AttemptOutcome::Transient {
                    reason: format!("HTTP {}", status),
                    retry_after,
                }
            }
            StatusClass::Permanent => AttemptOutcome::Permanent(format!("HTTP {}", status)),
        }
    }
}

fn classify_request_error(e: &reqwest::Error) -> AttemptOutcome {
    if e.is_builder() || e.is_redirect() || e.is_decode() {
        AttemptOutcome::Permanent(e.to_string())
    } else {
        // 超时、连接失败、读响应体中断
        AttemptOutcome::Transient {
            reason: e.to_string(),
            retry_after: None,
        }
    }
}

/// `Retry-After` 可以是秒数或 HTTP 日期
pub fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    httpdate::parse_http_date(value)
        .ok()
        .map(|at| at.duration_since(now).unwrap_or(Duration::ZERO))
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String> {
        fetch_with_retries(&request.url, self.max_retries, self.retry_delay, |_| self.attempt(request)).await
    }
}
