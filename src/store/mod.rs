//! 存储契约：按组合键 upsert（整行覆盖）、按键查询、按键前缀扫描。
//!
//! 表采用单表设计：行情 `PK=STOCK#<symbol>` / `SK=MARKETDATA#<date>`，
//! 指数 `PK=INDEX#<name>` / `SK=DATA#<date>`，另有 `<a>_<b>` 形式的二级查找键。

pub mod arrow_store;
pub mod memory;

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub use arrow_store::ArrowStore;
pub use memory::MemoryStore;

pub const MARKET_PK_PREFIX: &str = "STOCK#";
pub const MARKET_SK_PREFIX: &str = "MARKETDATA#";
pub const INDEX_PK_PREFIX: &str = "INDEX#";
pub const INDEX_SK_PREFIX: &str = "DATA#";

pub fn market_key(symbol: &str, date: &str) -> (String, String) {
    (format!("{}{}", MARKET_PK_PREFIX, symbol), format!("{}{}", MARKET_SK_PREFIX, date))
}

pub fn index_key(name: &str, date: &str) -> (String, String) {
    (format!("{}{}", INDEX_PK_PREFIX, name), format!("{}{}", INDEX_SK_PREFIX, date))
}

pub fn lookup_key(a: &str, b: &str) -> String {
    format!("{}_{}", a, b)
}

/// 行情表的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRow {
    pub pk: String,
    pub sk: String,
    pub symbol_date: String,
    pub symbol: String,
    pub date: String,
    pub price: i64,
    pub change: i64,
    pub change_rate: f64,
    pub stock_name: String,
    pub foreigner_net_buy: Vec<i64>,
    pub foreigner_net_buy_date: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// 指数表的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRow {
    pub pk: String,
    pub sk: String,
    pub index_name_date: String,
    pub name: String,
    pub date: String,
    pub value: f64,
    pub change: f64,
    pub change_rate: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// 可按组合键存放的行
pub trait Keyed: Clone {
    fn primary_key(&self) -> (String, String);
    fn lookup(&self) -> &str;
    fn created_at(&self) -> &str;
    fn set_created_at(&mut self, created_at: String);
}

impl Keyed for MarketRow {
    fn primary_key(&self) -> (String, String) {
        (self.pk.clone(), self.sk.clone())
    }
    fn lookup(&self) -> &str {
        &self.symbol_date
    }
    fn created_at(&self) -> &str {
        &self.created_at
    }
    fn set_created_at(&mut self, created_at: String) {
        self.created_at = created_at;
    }
}

impl Keyed for IndexRow {
    fn primary_key(&self) -> (String, String) {
        (self.pk.clone(), self.sk.clone())
    }
    fn lookup(&self) -> &str {
        &self.index_name_date
    }
    fn created_at(&self) -> &str {
        &self.created_at
    }
    fn set_created_at(&mut self, created_at: String) {
        self.created_at = created_at;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// 以 (PK, SK) 为主键、带二级查找索引的内存表
#[derive(Debug, Clone)]
pub struct KeyedTable<R> {
    rows: BTreeMap<(String, String), R>,
    lookup_index: HashMap<String, (String, String)>,
}

impl<R> Default for KeyedTable<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            lookup_index: HashMap::new(),
        }
    }
}

impl<R: Keyed> KeyedTable<R> {
    pub fn from_rows(rows: Vec<R>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.upsert(row);
        }
        table
    }

    /// 整行覆盖；已存在的键保留原 created_at
    pub fn upsert(&mut self, mut row: R) -> UpsertOutcome {
        let key = row.primary_key();
        let outcome = match self.rows.get(&key) {
            Some(existing) => {
                row.set_created_at(existing.created_at().to_string());
                UpsertOutcome::Replaced
            }
            None => UpsertOutcome::Inserted,
        };
        self.lookup_index.insert(row.lookup().to_string(), key.clone());
        self.rows.insert(key, row);
        outcome
    }

    pub fn get(&self, pk: &str, sk: &str) -> Option<&R> {
        self.rows.get(&(pk.to_string(), sk.to_string()))
    }

    pub fn get_by_lookup(&self, lookup: &str) -> Option<&R> {
        self.lookup_index.get(lookup).and_then(|key| self.rows.get(key))
    }

    pub fn scan_prefix(&self, pk_prefix: &str) -> Vec<R> {
        self.rows
            .iter()
            .filter(|((pk, _), _)| pk.starts_with(pk_prefix))
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &R> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 存储后端。实现需保证单条 upsert 原子，跨记录不提供事务。
#[async_trait]
pub trait RecordStore {
    async fn upsert_market(&self, row: MarketRow) -> Result<UpsertOutcome>;

    async fn upsert_index(&self, row: IndexRow) -> Result<UpsertOutcome>;

    async fn get_market(&self, symbol: &str, date: &str) -> Result<Option<MarketRow>>;

    /// 通过 `<symbol>_<date>` 查找
    async fn get_market_by_lookup(&self, symbol_date: &str) -> Result<Option<MarketRow>>;

    async fn get_index(&self, name: &str, date: &str) -> Result<Option<IndexRow>>;

    /// 通过 `<name>_<date>` 查找
    async fn get_index_by_lookup(&self, name_date: &str) -> Result<Option<IndexRow>>;

    /// 返回 PK 以给定前缀开头的全部行情行
    async fn scan_market(&self, pk_prefix: &str) -> Result<Vec<MarketRow>>;
}
