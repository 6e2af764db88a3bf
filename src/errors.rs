use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlerError {
    /// 抓取内容中缺少期望字段，或字段格式错误
    #[error("Field not found: {0}")]
    NotFound(String),

    /// 重试耗尽或不可重试的客户端错误；可重试的失败只在重试循环内部出现
    #[error("Fetch failed for {url}: {reason}")]
    PermanentFetch { url: String, reason: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Batch error: {0}")]
    Batch(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    ArrowError(String),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl CrawlerError {
    /// 是否属于抓取阶段的失败（而非存储或内部错误）
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, CrawlerError::PermanentFetch { .. } | CrawlerError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CrawlerError>;

impl From<arrow_schema::ArrowError> for CrawlerError {
    fn from(e: arrow_schema::ArrowError) -> Self {
        CrawlerError::ArrowError(e.to_string())
    }
}

// 用于从字符串创建错误
impl From<String> for CrawlerError {
    fn from(s: String) -> Self {
        CrawlerError::Unknown(s)
    }
}

// 用于从&str创建错误
impl From<&str> for CrawlerError {
    fn from(s: &str) -> Self {
        CrawlerError::Unknown(s.to_string())
    }
}
