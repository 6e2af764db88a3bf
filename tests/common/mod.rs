#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use fiflow_crawler::config::Config;
use fiflow_crawler::errors::{CrawlerError, Result};
use fiflow_crawler::scrapers::{FetchRequest, NaverScraper, PageFetcher};
use fiflow_crawler::services::{BatchRunner, PersistenceAdapter, SymbolCollector};
use fiflow_crawler::store::{IndexRow, MarketRow, MemoryStore, RecordStore, UpsertOutcome};
use std::sync::{Arc, Mutex};

pub const SISE_HTML: &str = include_str!("../fixtures/sise.html");
pub const MAIN_HTML: &str = include_str!("../fixtures/main.html");
pub const FRGN_HTML: &str = include_str!("../fixtures/frgn.html");
pub const INDEX_JSON: &str = include_str!("../fixtures/index.json");
pub const REALTIME_JSON: &str = include_str!("../fixtures/realtime.json");

pub const RUN_DATE: &str = "2025-08-05";

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 5).unwrap()
}

#[derive(Clone)]
pub enum Reply {
    Body(String),
    Fail,
    Panic,
}

/// 按 URL 子串返回固定内容；先注册的规则优先
#[derive(Default)]
pub struct FixtureFetcher {
    routes: Vec<(String, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有页面都返回保存的样例
    pub fn naver() -> Self {
        Self::new()
            .route("sise.naver", Reply::Body(SISE_HTML.to_string()))
            .route("main.naver", Reply::Body(MAIN_HTML.to_string()))
            .route("frgn.naver", Reply::Body(FRGN_HTML.to_string()))
            .route("SERVICE_INDEX", Reply::Body(INDEX_JSON.to_string()))
            .route("SERVICE_ITEM", Reply::Body(REALTIME_JSON.to_string()))
    }

    pub fn route(mut self, pattern: &str, reply: Reply) -> Self {
        self.routes.push((pattern.to_string(), reply));
        self
    }

    /// 插到最前面，覆盖已有规则
    pub fn override_route(mut self, pattern: &str, reply: Reply) -> Self {
        self.routes.insert(0, (pattern.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|url| url.contains(pattern)).count()
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.url.clone());

        let reply = self
            .routes
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Panic) => panic!("fixture panic for {}", request.url),
            Some(Reply::Fail) | None => Err(CrawlerError::PermanentFetch {
                url: request.url.clone(),
                reason: "HTTP 404 Not Found".to_string(),
            }),
        }
    }
}

/// 写入或扫描时报错的存储
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_writes: bool,
    pub fail_scan: bool,
}

impl FailingStore {
    pub fn writes() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }

    pub fn scans() -> Self {
        Self { fail_scan: true, ..Self::default() }
    }
}

fn unreachable_store() -> CrawlerError {
    CrawlerError::Persistence("store unreachable".to_string())
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn upsert_market(&self, row: MarketRow) -> Result<UpsertOutcome> {
        if self.fail_writes {
            return Err(unreachable_store());
        }
        self.inner.upsert_market(row).await
    }

    async fn upsert_index(&self, row: IndexRow) -> Result<UpsertOutcome> {
        if self.fail_writes {
            return Err(unreachable_store());
        }
        self.inner.upsert_index(row).await
    }

    async fn get_market(&self, symbol: &str, date: &str) -> Result<Option<MarketRow>> {
        self.inner.get_market(symbol, date).await
    }

    async fn get_market_by_lookup(&self, symbol_date: &str) -> Result<Option<MarketRow>> {
        self.inner.get_market_by_lookup(symbol_date).await
    }

    async fn get_index(&self, name: &str, date: &str) -> Result<Option<IndexRow>> {
        self.inner.get_index(name, date).await
    }

    async fn get_index_by_lookup(&self, name_date: &str) -> Result<Option<IndexRow>> {
        self.inner.get_index_by_lookup(name_date).await
    }

    async fn scan_market(&self, pk_prefix: &str) -> Result<Vec<MarketRow>> {
        if self.fail_scan {
            return Err(unreachable_store());
        }
        self.inner.scan_market(pk_prefix).await
    }
}

pub fn scraper(fetcher: Arc<FixtureFetcher>) -> Arc<NaverScraper> {
    Arc::new(NaverScraper::new(fetcher, &Config::new()))
}

pub fn runner(fetcher: Arc<FixtureFetcher>, store: Arc<dyn RecordStore + Send + Sync>) -> BatchRunner {
    let config = Config::new();
    BatchRunner::new(SymbolCollector::new(scraper(fetcher)), PersistenceAdapter::new(store), &config)
        .with_date(run_date())
}

pub fn symbols(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| s.to_string()).collect())
}
