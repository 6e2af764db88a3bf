use crate::errors::{CrawlerError, Result};
use crate::store::{
    index_key, market_key, IndexRow, KeyedTable, MarketRow, RecordStore, UpsertOutcome,
};
use crate::util::arrow_utils;
use arrow_array::RecordBatch;
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const MARKET_FILE: &str = "market.arrow";
pub const INDEX_FILE: &str = "index.arrow";

/// 基于 Arrow IPC 文件的存储。
///
/// 启动时整表载入内存，每次 upsert 先在阻塞线程池写文件，写成功后才替换内存中的表，
/// 因此写失败时内存和磁盘保持一致。
pub struct ArrowStore {
    market_path: PathBuf,
    index_path: PathBuf,
    market: Mutex<KeyedTable<MarketRow>>,
    index: Mutex<KeyedTable<IndexRow>>,
}

impl ArrowStore {
    /// 打开数据目录，文件不存在时视为空表
    pub fn open(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        let market_path = dir.join(MARKET_FILE);
        let index_path = dir.join(INDEX_FILE);

        let market = KeyedTable::from_rows(load_rows(&market_path, arrow_utils::market_rows_from_record_batch)?);
        let index = KeyedTable::from_rows(load_rows(&index_path, arrow_utils::index_rows_from_record_batch)?);
        if market.is_empty() && index.is_empty() {
            info!("Opened empty store at {}", dir.display());
        } else {
            info!(
                "Opened store at {}: {} market rows, {} index rows",
                dir.display(),
                market.len(),
                index.len()
            );
        }

        Ok(Self {
            market_path,
            index_path,
            market: Mutex::new(market),
            index: Mutex::new(index),
        })
    }

    /// 创建空文件（已存在则不覆盖）
    pub fn init(data_dir: &str) -> Result<Self> {
        let store = Self::open(data_dir)?;
        if !store.market_path.exists() {
            arrow_utils::save_record_batch(&arrow_utils::market_rows_to_record_batch(&[])?, &store.market_path)?;
        }
        if !store.index_path.exists() {
            arrow_utils::save_record_batch(&arrow_utils::index_rows_to_record_batch(&[])?, &store.index_path)?;
        }
        Ok(store)
    }

    pub fn market_path(&self) -> &Path {
        &self.market_path
    }

    pub async fn market_rows(&self) -> Vec<MarketRow> {
        self.market.lock().await.rows().cloned().collect()
    }

    pub async fn index_rows(&self) -> Vec<IndexRow> {
        self.index.lock().await.rows().cloned().collect()
    }
}

fn load_rows<R, F>(path: &Path, decode: F) -> Result<Vec<R>>
where
    F: Fn(&arrow_array::RecordBatch) -> Result<Vec<R>>,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rows = Vec::new();
    for batch in arrow_utils::read_record_batches(path)? {
        rows.extend(decode(&batch)?);
    }
    Ok(rows)
}

fn persistence_error(path: &Path, e: CrawlerError) -> CrawlerError {
    CrawlerError::Persistence(format!("write {} failed: {}", path.display(), e))
}

async fn save_blocking(batch: RecordBatch, path: &Path) -> Result<()> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || arrow_utils::save_record_batch(&batch, &target))
        .await
        .map_err(|e| CrawlerError::Persistence(format!("write task failed: {}", e)))?
}

#[async_trait]
impl RecordStore for ArrowStore {
    async fn upsert_market(&self, row: MarketRow) -> Result<UpsertOutcome> {
        let mut table = self.market.lock().await;
        let mut next = table.clone();
        let outcome = next.upsert(row);

        let rows: Vec<MarketRow> = next.rows().cloned().collect();
        let batch = arrow_utils::market_rows_to_record_batch(&rows).map_err(|e| persistence_error(&self.market_path, e))?;
        save_blocking(batch, &self.market_path)
            .await
            .map_err(|e| persistence_error(&self.market_path, e))?;

        *table = next;
        Ok(outcome)
    }

    async fn upsert_index(&self, row: IndexRow) -> Result<UpsertOutcome> {
        let mut table = self.index.lock().await;
        let mut next = table.clone();
        let outcome = next.upsert(row);

        let rows: Vec<IndexRow> = next.rows().cloned().collect();
        let batch = arrow_utils::index_rows_to_record_batch(&rows).map_err(|e| persistence_error(&self.index_path, e))?;
        save_blocking(batch, &self.index_path)
            .await
            .map_err(|e| persistence_error(&self.index_path, e))?;

        *table = next;
        Ok(outcome)
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
