use crate::config::Config;
use crate::errors::{CrawlerError, Result};
use crate::models::index::IndexCode;
use crate::models::trigger::{SymbolTarget, TargetStatus, TriggerEvent, TriggerResponse};
use crate::services::collector::SymbolCollector;
use crate::services::persistence::PersistenceAdapter;
use crate::util::seoul_today;
use chrono::NaiveDate;
use futures::FutureExt;
use log::{error, info, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;

/// 批处理：逐个处理目标，单个目标的失败（包括 panic）只记为 failed
pub struct BatchRunner {
    collector: SymbolCollector,
    persistence: PersistenceAdapter,
    default_indices: Vec<IndexCode>,
    date: Option<NaiveDate>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn failure_kind(e: &CrawlerError) -> &'static str {
    if e.is_fetch_failure() {
        "fetch"
    } else {
        "persist"
    }
}

impl BatchRunner {
    pub fn new(collector: SymbolCollector, persistence: PersistenceAdapter, config: &Config) -> Self {
        Self {
            collector,
            persistence,
            default_indices: config.default_indices.clone(),
            date: None,
        }
    }

    /// 固定运行日期，默认取首尔当日
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn run_date(&self) -> String {
        self.date.unwrap_or_else(seoul_today).format("%Y-%m-%d").to_string()
    }

    /// 显式列表原样使用（空列表即空批次）；未提供时从存储中发现
    pub async fn resolve_targets(&self, symbols: Option<Vec<String>>) -> Result<Vec<SymbolTarget>> {
        match symbols {
            Some(symbols) => Ok(symbols
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(SymbolTarget::new)
                .collect()),
            None => self.persistence.known_targets().await,
        }
    }

    /// 只有目标发现失败时返回 `Err`
    pub async fn run_markets(&self, symbols: Option<Vec<String>>) -> Result<Vec<TargetStatus>> {
        let targets = self.resolve_targets(symbols).await?;
        Ok(self.run_targets(&targets).await)
    }

    pub async fn run_targets(&self, targets: &[SymbolTarget]) -> Vec<TargetStatus> {
        let date = self.run_date();
        info!("Processing {} symbols for {}", targets.len(), date);

        let mut statuses = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = AssertUnwindSafe(self.process_symbol(target, &date))
                .catch_unwind()
                .await;
            let status = match outcome {
                Ok(Ok(())) => TargetStatus::success(&target.symbol),
                Ok(Err(e)) => {
                    error!("[{}] failed ({}): {}", target.symbol, failure_kind(&e), e);
                    TargetStatus::failed(&target.symbol)
                }
                Err(payload) => {
                    error!("[{}] panicked: {}", target.symbol, panic_message(payload.as_ref()));
                    TargetStatus::failed(&target.symbol)
                }
            };
            statuses.push(status);
        }

        let ok = statuses.iter().filter(|s| s.is_success()).count();
        info!("Market batch done: {}/{} succeeded", ok, statuses.len());
        statuses
    }

    async fn process_symbol(&self, target: &SymbolTarget, date: &str) -> Result<()> {
        info!("[{}] collecting", target.symbol);
        let record = self.collector.collect(target, date).await?;
        self.persistence.persist_market(&record).await?;
        info!("[{}] saved {} ({})", target.symbol, record.stock_name, date);
        Ok(())
    }

    /// 未提供时使用默认的三个指数；无法识别的代码记为 failed
    pub async fn run_indices(&self, indices: Option<Vec<String>>) -> Vec<TargetStatus> {
        let names: Vec<String> = match indices {
            Some(names) => names,
            None => self.default_indices.iter().map(|c| c.to_string()).collect(),
        };
        let date = self.run_date();

        let mut statuses = Vec::with_capacity(names.len());
        for name in &names {
            let code = match IndexCode::from_str(name) {
                Ok(code) => code,
                Err(e) => {
                    warn!("{}", e);
                    statuses.push(TargetStatus::failed(name));
                    continue;
                }
            };

            let outcome = AssertUnwindSafe(self.process_index(code, &date))
                .catch_unwind()
                .await;
            let status = match outcome {
                Ok(Ok(())) => TargetStatus::success(code.as_str()),
                Ok(Err(e)) => {
                    error!("[{}] failed ({}): {}", code, failure_kind(&e), e);
                    TargetStatus::failed(code.as_str())
                }
                Err(payload) => {
                    error!("[{}] panicked: {}", code, panic_message(payload.as_ref()));
                    TargetStatus::failed(code.as_str())
                }
            };
            statuses.push(status);
        }
        statuses
    }

    async fn process_index(&self, code: IndexCode, date: &str) -> Result<()> {
        let record = self.collector.collect_index(code, date).await?;
        self.persistence.persist_index(&record).await?;
        Ok(())
    }

    /// 先股票后指数；目标发现失败时返回 500
    pub async fn handle(&self, event: TriggerEvent) -> TriggerResponse {
        let mut statuses = match self.run_markets(event.symbols).await {
            Ok(statuses) => statuses,
            Err(e) => {
                let e = CrawlerError::Batch(e.to_string());
                error!("{}", e);
                return TriggerResponse::error(e.to_string());
            }
        };
        statuses.extend(self.run_indices(event.indices).await);
        TriggerResponse::ok(statuses)
    }
}
