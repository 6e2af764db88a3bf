use crate::errors::{CrawlerError, Result};
use crate::models::index::IndexRecord;
use crate::models::market::MarketRecord;
use crate::models::trigger::SymbolTarget;
use crate::store::{
    index_key, lookup_key, market_key, IndexRow, MarketRow, RecordStore, UpsertOutcome, MARKET_PK_PREFIX,
};
use crate::util::utc_timestamp;
use chrono::Utc;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 记录 → 存储行，按自然键整行覆盖
pub struct PersistenceAdapter {
    store: Arc<dyn RecordStore + Send + Sync>,
}

pub fn market_row(record: &MarketRecord, now: &str) -> MarketRow {
    let (pk, sk) = market_key(&record.symbol, &record.date);
    MarketRow {
        pk,
        sk,
        symbol_date: lookup_key(&record.symbol, &record.date),
        symbol: record.symbol.clone(),
        date: record.date.clone(),
        price: record.price,
        change: record.change,
        change_rate: record.change_rate,
        stock_name: record.stock_name.clone(),
        foreigner_net_buy: record.foreigner_flow.net_buys(),
        foreigner_net_buy_date: record.foreigner_flow.dates(),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}

pub fn index_row(record: &IndexRecord, now: &str) -> IndexRow {
    let name = record.name.as_str();
    let (pk, sk) = index_key(name, &record.date);
    IndexRow {
        pk,
        sk,
        index_name_date: lookup_key(name, &record.date),
        name: name.to_string(),
        date: record.date.clone(),
        value: record.value,
        change: record.change,
        change_rate: record.change_rate,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}

// 存储层的任何错误对调用方都是 Persistence
fn store_error(e: CrawlerError) -> CrawlerError {
    match e {
        CrawlerError::Persistence(_) => e,
        other => CrawlerError::Persistence(other.to_string()),
    }
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn RecordStore + Send + Sync>) -> Self {
        Self { store }
    }

    pub async fn persist_market(&self, record: &MarketRecord) -> Result<UpsertOutcome> {
        let row = market_row(record, &utc_timestamp(Utc::now()));
        let outcome = self.store.upsert_market(row).await.map_err(store_error)?;
        debug!("[{}] {} {:?}", record.symbol, record.date, outcome);
        Ok(outcome)
    }

    pub async fn persist_index(&self, record: &IndexRecord) -> Result<UpsertOutcome> {
        let row = index_row(record, &utc_timestamp(Utc::now()));
        let outcome = self.store.upsert_index(row).await.map_err(store_error)?;
        debug!("[{}] {} {:?}", record.name, record.date, outcome);
        Ok(outcome)
    }

    /// 存储中出现过的全部股票，附最近一天的名称作为兜底
    pub async fn known_targets(&self) -> Result<Vec<SymbolTarget>> {
        let rows = self.store.scan_market(MARKET_PK_PREFIX).await.map_err(store_error)?;

        let mut latest: BTreeMap<String, MarketRow> = BTreeMap::new();
        for row in rows {
            match latest.get(&row.symbol) {
                Some(seen) if seen.date >= row.date => {}
                _ => {
                    latest.insert(row.symbol.clone(), row);
                }
            }
        }

        let targets: Vec<SymbolTarget> = latest
            .values()
            .map(|row| SymbolTarget::with_hint(&row.symbol, &row.stock_name))
            .collect();
        info!("Discovered {} symbols in store", targets.len());
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::index::{IndexCode, IndexSnapshot};
    use crate::models::market::{ForeignerDay, ForeignerFlow, Quote};
    use crate::store::MemoryStore;

    fn record(symbol: &str, date: &str, name: &str) -> MarketRecord {
        let flow = ForeignerFlow::from_days(vec![ForeignerDay { date: "2025-08-04".to_string(), net_buy: -10 }]);
        MarketRecord::new(symbol, date, Quote::derive(10500, 500).unwrap(), name.to_string(), flow)
    }

    #[test]
    fn market_row_flattens_flow_in_order() {
        let row = market_row(&record("005930", "2025-08-05", "삼성전자"), "t");
        assert_eq!(row.pk, "STOCK#005930");
        assert_eq!(row.sk, "MARKETDATA#2025-08-05");
        assert_eq!(row.symbol_date, "005930_2025-08-05");
        assert_eq!(row.change_rate, 5.0);
        assert_eq!(row.foreigner_net_buy.len(), 8);
        assert_eq!(row.foreigner_net_buy_date.len(), 8);
        assert_eq!(row.foreigner_net_buy[0], -10);
        assert_eq!(row.foreigner_net_buy_date[0], "2025-08-04");
    }

    #[test]
    fn index_row_keys() {
        let snapshot = IndexSnapshot { value: 75230.0, change: 45.0, change_rate: 0.6 };
        let row = index_row(&IndexRecord::new(IndexCode::Kosdaq, "2025-08-05", snapshot), "t");
        assert_eq!(row.pk, "INDEX#KOSDAQ");
        assert_eq!(row.sk, "DATA#2025-08-05");
        assert_eq!(row.index_name_date, "KOSDAQ_2025-08-05");
    }

    #[tokio::test]
    async fn known_targets_use_latest_name() {
        let store = Arc::new(MemoryStore::new());
        let adapter = PersistenceAdapter::new(store.clone());
        adapter.persist_market(&record("005930", "2025-08-04", "옛이름")).await.unwrap();
        adapter.persist_market(&record("005930", "2025-08-05", "삼성전자")).await.unwrap();
        adapter.persist_market(&record("000660", "2025-08-01", "SK하이닉스")).await.unwrap();

        let targets = adapter.known_targets().await.unwrap();
        assert_eq!(
            targets,
            vec![
                SymbolTarget::with_hint("000660", "SK하이닉스"),
                SymbolTarget::with_hint("005930", "삼성전자"),
            ]
        );
    }

    #[test]
    fn store_errors_become_persistence() {
        assert!(matches!(store_error(CrawlerError::Unknown("x".into())), CrawlerError::Persistence(_)));
        assert!(matches!(store_error(CrawlerError::Persistence("x".into())), CrawlerError::Persistence(m) if m == "x"));
    }
}
