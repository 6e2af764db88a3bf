use crate::errors::{CrawlerError, Result};
use crate::models::index::{IndexCode, IndexRecord};
use crate::models::market::{ForeignerFlow, MarketRecord};
use crate::models::trigger::SymbolTarget;
use crate::scrapers::naver::NaverScraper;
use log::{info, warn};
use std::sync::Arc;

/// 单只股票的三个子抓取 + 合并
pub struct SymbolCollector {
    scraper: Arc<NaverScraper>,
}

impl SymbolCollector {
    pub fn new(scraper: Arc<NaverScraper>) -> Self {
        Self { scraper }
    }

    /// 生成某日的完整行情记录。
    ///
    /// 行情失败立即返回错误；名称失败时用旧名称兜底，没有旧名称同样失败；
    /// 外国人数据失败不影响结果，以 8 个 (0, "") 代替。
    pub async fn collect(&self, target: &SymbolTarget, date: &str) -> Result<MarketRecord> {
        let symbol = target.symbol.as_str();
        let quote = self.scraper.fetch_quote(symbol).await?;
        let stock_name = self.resolve_name(target).await?;

        let foreigner_flow = match self.scraper.fetch_foreigner_flow(symbol).await {
            Ok(flow) => flow,
            Err(e) => {
                warn!("[{}] foreigner flow unavailable, storing zeros: {}", symbol, e);
                ForeignerFlow::empty()
            }
        };

        Ok(MarketRecord::new(symbol, date, quote, stock_name, foreigner_flow))
    }

    async fn resolve_name(&self, target: &SymbolTarget) -> Result<String> {
        match self.scraper.fetch_stock_name(&target.symbol).await {
            Ok(name) => Ok(name),
            Err(e) => match &target.name_hint {
                Some(hint) => {
                    warn!("[{}] name fetch failed, using last known name {:?}: {}", target.symbol, hint, e);
                    Ok(hint.clone())
                }
                None => Err(CrawlerError::NotFound(format!(
                    "stock name of {} (no fallback): {}",
                    target.symbol, e
                ))),
            },
        }
    }

    pub async fn collect_index(&self, code: IndexCode, date: &str) -> Result<IndexRecord> {
        let snapshot = self.scraper.fetch_index(code).await?;
        info!(
            "[{}] value={:.2}, change={:.2}, changeRate={}",
            code, snapshot.value, snapshot.change, snapshot.change_rate
        );
        Ok(IndexRecord::new(code, date, snapshot))
    }
}
