use crate::config::Config;
use crate::errors::{CrawlerError, Result};
use crate::models::index::{IndexCode, IndexSnapshot};
use crate::models::market::{ForeignerFlow, Quote};
use crate::scrapers::base::{FetchRequest, PageFetcher};
use crate::scrapers::extract;
use crate::scrapers::locators::{Locators, NAVER};
use log::{debug, info};
use std::sync::Arc;

/// 各子抓取：抓取 + 提取。抓取失败或字段缺失都以 `Err` 返回。
pub struct NaverScraper {
    fetcher: Arc<dyn PageFetcher + Send + Sync>,
    finance_base_url: String,
    polling_base_url: String,
    locators: Locators,
}

impl NaverScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher + Send + Sync>, config: &Config) -> Self {
        Self {
            fetcher,
            finance_base_url: config.finance_base_url.clone(),
            polling_base_url: config.polling_base_url.clone(),
            locators: NAVER,
        }
    }

    pub fn quote_url(&self, symbol: &str) -> String {
        format!("{}/item/sise.naver?code={}", self.finance_base_url, symbol)
    }

    pub fn main_url(&self, symbol: &str) -> String {
        format!("{}/item/main.naver?code={}", self.finance_base_url, symbol)
    }

    pub fn foreigner_url(&self, symbol: &str) -> String {
        format!("{}/item/frgn.naver?code={}", self.finance_base_url, symbol)
    }

    pub fn index_url(&self, code: IndexCode) -> String {
        format!("{}/api/realtime?query=SERVICE_INDEX:{}", self.polling_base_url, code)
    }

    pub fn realtime_url(&self, symbol: &str) -> String {
        format!("{}/api/realtime?query=SERVICE_ITEM:{}", self.polling_base_url, symbol)
    }

    async fn get(&self, request: FetchRequest) -> Result<String> {
        self.fetcher.fetch(&request).await
    }

    /// 现价与涨跌
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let body = self.get(FetchRequest::new(self.quote_url(symbol))).await?;
        let quote = extract::extract_quote(&body, &self.locators.html)
            .ok_or_else(|| CrawlerError::NotFound(format!("quote of {}", symbol)))?;
        info!(
            "[{}] quote: price={}, change={}, changeRate={}",
            symbol, quote.price, quote.change, quote.change_rate
        );
        Ok(quote)
    }

    pub async fn fetch_stock_name(&self, symbol: &str) -> Result<String> {
        let body = self.get(FetchRequest::new(self.main_url(symbol))).await?;
        let name = extract::extract_stock_name(&body, &self.locators.html)
            .ok_or_else(|| CrawlerError::NotFound(format!("stock name of {}", symbol)))?;
        debug!("[{}] name: {}", symbol, name);
        Ok(name)
    }

    pub async fn fetch_foreigner_flow(&self, symbol: &str) -> Result<ForeignerFlow> {
        let body = self.get(FetchRequest::new(self.foreigner_url(symbol))).await?;
        let flow = extract::extract_foreigner_flow(&body, &self.locators.html)
            .ok_or_else(|| CrawlerError::NotFound(format!("foreigner flow of {}", symbol)))?;
        debug!("[{}] foreigner flow: {} days", symbol, flow.filled());
        Ok(flow)
    }

    pub async fn fetch_index(&self, code: IndexCode) -> Result<IndexSnapshot> {
        let body = self.get(FetchRequest::new(self.index_url(code))).await?;
        extract::extract_index_snapshot(&body, code, &self.locators.json)
            .ok_or_else(|| CrawlerError::NotFound(format!("index {}", code)))
    }

    /// 实时接口的个股行情，涨跌幅由接口直接给出
    pub async fn fetch_realtime_quote(&self, symbol: &str) -> Result<Quote> {
        let request = FetchRequest::new(self.realtime_url(symbol)).with_referer(self.quote_url(symbol));
        let body = self.get(request).await?;
        extract::extract_realtime_quote(&body, &self.locators.json)
            .ok_or_else(|| CrawlerError::NotFound(format!("realtime quote of {}", symbol)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<FetchRequest>>,
    }

    #[async_trait]
    impl PageFetcher for Recorder {
        async fn fetch(&self, request: &FetchRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(r#"{"result":{"areas":[{"datas":[{"nv":1000,"cv":10,"cr":1.01,"rf":"2"}]}]}}"#.to_string())
        }
    }

    #[test]
    fn builds_urls_from_config() {
        let config = Config::new().with_base_urls("http://finance.test/", "http://polling.test");
        let scraper = NaverScraper::new(Arc::new(Recorder::default()), &config);
        assert_eq!(scraper.quote_url("005930"), "http://finance.test/item/sise.naver?code=005930");
        assert_eq!(scraper.foreigner_url("005930"), "http://finance.test/item/frgn.naver?code=005930");
        assert_eq!(
            scraper.index_url(IndexCode::Kpi200),
            "http://polling.test/api/realtime?query=SERVICE_INDEX:KPI200"
        );
    }

    #[tokio::test]
    async fn realtime_request_carries_referer() {
        let recorder = Arc::new(Recorder::default());
        let scraper = NaverScraper::new(recorder.clone(), &Config::new());
        let quote = scraper.fetch_realtime_quote("005930").await.unwrap();
        assert_eq!(quote.change, 10);

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].referer.as_deref(),
            Some("https://finance.naver.com/item/sise.naver?code=005930")
        );
    }

    #[tokio::test]
    async fn unparsable_page_is_not_found() {
        let scraper = NaverScraper::new(Arc::new(Recorder::default()), &Config::new());
        let err = scraper.fetch_stock_name("005930").await.unwrap_err();
        assert!(matches!(err, CrawlerError::NotFound(_)));
    }
}
