use crate::errors::Result;
use crate::store::{
    index_key, market_key, IndexRow, KeyedTable, MarketRow, RecordStore, UpsertOutcome,
};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// 进程内存储，`--dry-run` 与测试使用
#[derive(Default)]
pub struct MemoryStore {
    market: Mutex<KeyedTable<MarketRow>>,
    index: Mutex<KeyedTable<IndexRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn market_len(&self) -> usize {
        self.market.lock().await.len()
    }

    pub async fn index_len(&self) -> usize {
        self.index.lock().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_market(&self, row: MarketRow) -> Result<UpsertOutcome> {
        Ok(self.market.lock().await.upsert(row))
    }

    async fn upsert_index(&self, row: IndexRow) -> Result<UpsertOutcome> {
        Ok(self.index.lock().await.upsert(row))
    }

    async fn get_market(&self, symbol: &str, date: &str) -> Result<Option<MarketRow>> {
        let (pk, sk) = market_key(symbol, date);
        Ok(self.market.lock().await.get(&pk, &sk).cloned())
    }

    async fn get_market_by_lookup(&self, symbol_date: &str) -> Result<Option<MarketRow>> {
        Ok(self.market.lock().await.get_by_lookup(symbol_date).cloned())
    }

    async fn get_index(&self, name: &str, date: &str) -> Result<Option<IndexRow>> {
        let (pk, sk) = index_key(name, date);
        Ok(self.index.lock().await.get(&pk, &sk).cloned())
    }

    async fn get_index_by_lookup(&self, name_date: &str) -> Result<Option<IndexRow>> {
        Ok(self.index.lock().await.get_by_lookup(name_date).cloned())
    }

    async fn scan_market(&self, pk_prefix: &str) -> Result<Vec<MarketRow>> {
        Ok(self.market.lock().await.scan_prefix(pk_prefix))
    }
}
