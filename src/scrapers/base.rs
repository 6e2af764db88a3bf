use crate::errors::{CrawlerError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// 一次出站请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub referer: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// 页面/接口抓取。失败一律以 `Err` 返回（重试耗尽后为 `PermanentFetch`），不 panic。
#[async_trait]
pub trait PageFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String>;
}

/// 单次尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    /// 网络错误、超时、5xx、429；`retry_after` 为服务端建议的等待时间
    Transient { reason: String, retry_after: Option<Duration> },
    /// 其余 4xx、响应格式错误
    Permanent(String),
}

/// 按 HTTP 状态码分类：2xx 成功，429 和 5xx 可重试，其余不可重试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Permanent,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 | 500..=599 => StatusClass::Transient,
        _ => StatusClass::Permanent,
    }
}

/// 首次尝试后最多再重试 `max_retries` 次，仅对 `Transient` 重试。
///
/// `attempt` 的参数为从 1 开始的尝试序号。
pub async fn fetch_with_retries<F, Fut>(
    url: &str,
    max_retries: u32,
    retry_delay: Duration,
    mut attempt: F,
) -> Result<String>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome>,
{
    let total = max_retries.saturating_add(1);
    let mut last_reason = String::new();

    for n in 1..=total {
        match attempt(n).await {
            AttemptOutcome::Success(body) => {
                debug!("Fetched {} (attempt {}/{})", url, n, total);
                return Ok(body);
            }
            AttemptOutcome::Permanent(reason) => {
                warn!("Fetch {} failed permanently: {}", url, reason);
                return Err(CrawlerError::PermanentFetch {
                    url: url.to_string(),
                    reason,
                });
            }
            AttemptOutcome::Transient { reason, retry_after } => {
                warn!("Fetch {} failed (attempt {}/{}): {}", url, n, total, reason);
                last_reason = reason;
                if n < total {
                    let wait = retry_after.unwrap_or(retry_delay);
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }
    }

    Err(CrawlerError::PermanentFetch {
        url: url.to_string(),
        reason: format!("retries exhausted after {} attempts: {}", total, last_reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient(reason: &str) -> AttemptOutcome {
        AttemptOutcome::Transient { reason: reason.to_string(), retry_after: None }
    }

    #[test]
    fn classifies_status_codes() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(429), StatusClass::Transient);
        assert_eq!(classify_status(503), StatusClass::Transient);
        assert_eq!(classify_status(404), StatusClass::Permanent);
        assert_eq!(classify_status(403), StatusClass::Permanent);
        assert_eq!(classify_status(302), StatusClass::Permanent);
    }

    #[tokio::test]
    async fn retries_transient_twice_then_gives_up() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retries("http://x", 2, Duration::ZERO, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { transient("timeout") }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(CrawlerError::PermanentFetch { reason, .. }) => {
                assert!(reason.contains("retries exhausted after 3 attempts"));
                assert!(reason.contains("timeout"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let result = fetch_with_retries("http://x", 2, Duration::ZERO, |n| async move {
            if n < 3 { transient("502") } else { AttemptOutcome::Success("ok".to_string()) }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retries("http://x", 2, Duration::ZERO, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { AttemptOutcome::Permanent("HTTP 404".to_string()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(CrawlerError::PermanentFetch { .. })));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let _ = fetch_with_retries("http://x", 0, Duration::ZERO, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { transient("reset") }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn max_retry_bound_does_not_overflow() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retries("http://x", u32::MAX, Duration::ZERO, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { transient("reset") } else { AttemptOutcome::Permanent("HTTP 404".to_string()) } }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(CrawlerError::PermanentFetch { .. })));
    }
}
