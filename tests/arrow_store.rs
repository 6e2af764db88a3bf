mod common;

use common::*;
use fiflow_crawler::models::index::{IndexCode, IndexRecord, IndexSnapshot};
use fiflow_crawler::services::PersistenceAdapter;
use fiflow_crawler::store::arrow_store::{INDEX_FILE, MARKET_FILE};
use fiflow_crawler::store::{ArrowStore, RecordStore};
use fiflow_crawler::util::arrow_utils;
use std::sync::Arc;
use tempfile::TempDir;

fn dir_str(dir: &TempDir) -> String {
    dir.path().to_string_lossy().to_string()
}

#[test]
fn init_creates_empty_files() {
    let dir = TempDir::new().unwrap();
    ArrowStore::init(&dir_str(&dir)).unwrap();
    assert!(dir.path().join(MARKET_FILE).exists());
    assert!(dir.path().join(INDEX_FILE).exists());

    let batches = arrow_utils::read_record_batches(&dir.path().join(MARKET_FILE)).unwrap();
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn crawled_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArrowStore::open(&dir_str(&dir)).unwrap());
    let result = runner(Arc::new(FixtureFetcher::naver()), store.clone())
        .run_markets(symbols(&["005930"]))
        .await
        .unwrap();
    assert!(result[0].is_success());
    let written = store.get_market("005930", RUN_DATE).await.unwrap().unwrap();
    drop(store);

    let reopened = ArrowStore::open(&dir_str(&dir)).unwrap();
    let row = reopened.get_market_by_lookup("005930_2025-08-05").await.unwrap().unwrap();
    assert_eq!(row, written);
    assert_eq!(row.foreigner_net_buy.len(), 8);
    assert_eq!(row.foreigner_net_buy[0], 1234567);
    assert_eq!(row.foreigner_net_buy_date[7], "2025-07-25");

    let scanned = reopened.scan_market("STOCK#").await.unwrap();
    assert_eq!(scanned.len(), 1);
}

#[tokio::test]
async fn second_upsert_keeps_created_at_across_reopen() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArrowStore::open(&dir_str(&dir)).unwrap());
    let runner = runner(Arc::new(FixtureFetcher::naver()), store.clone());

    runner.run_markets(symbols(&["005930"])).await.unwrap();
    let first = store.get_market("005930", RUN_DATE).await.unwrap().unwrap();
    runner.run_markets(symbols(&["005930"])).await.unwrap();
    drop(runner);
    drop(store);

    let reopened = ArrowStore::open(&dir_str(&dir)).unwrap();
    assert_eq!(reopened.market_rows().await.len(), 1);
    let row = reopened.get_market("005930", RUN_DATE).await.unwrap().unwrap();
    assert_eq!(row.created_at, first.created_at);
    assert_eq!(row.price, first.price);
}

#[tokio::test]
async fn index_rows_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArrowStore::open(&dir_str(&dir)).unwrap());
    let adapter = PersistenceAdapter::new(store.clone());
    let snapshot = IndexSnapshot { value: 75230.0, change: 45.0, change_rate: 0.6 };
    adapter
        .persist_index(&IndexRecord::new(IndexCode::Kosdaq, RUN_DATE, snapshot))
        .await
        .unwrap();
    drop(adapter);
    drop(store);

    let reopened = ArrowStore::open(&dir_str(&dir)).unwrap();
    let rows = reopened.index_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pk, "INDEX#KOSDAQ");
    assert_eq!(rows[0].sk, "DATA#2025-08-05");
    assert_eq!(rows[0].value, 75230.0);
    assert!(reopened.get_index_by_lookup("KOSDAQ_2025-08-05").await.unwrap().is_some());
}

#[tokio::test]
async fn explore_dump_is_ndjson() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArrowStore::open(&dir_str(&dir)).unwrap());
    runner(Arc::new(FixtureFetcher::naver()), store.clone())
        .run_markets(symbols(&["005930", "000660"]))
        .await
        .unwrap();

    let rows = store.market_rows().await;
    let batch = arrow_utils::market_rows_to_record_batch(&rows).unwrap();
    let mut out = Vec::new();
    arrow_utils::write_ndjson(&batch, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["symbol"], "000660");
    assert_eq!(lines[1]["stockName"], "삼성전자");
    assert_eq!(lines[1]["foreignerNetBuy"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn failed_write_leaves_table_and_disk_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArrowStore::open(&dir_str(&dir)).unwrap());
    // 数据文件位置被目录占用，写入失败
    std::fs::create_dir(dir.path().join(MARKET_FILE)).unwrap();

    let result = runner(Arc::new(FixtureFetcher::naver()), store.clone())
        .run_markets(symbols(&["005930"]))
        .await
        .unwrap();

    assert!(!result[0].is_success());
    assert!(store.get_market("005930", RUN_DATE).await.unwrap().is_none());
    assert!(store.market_rows().await.is_empty());
    assert!(!dir.path().join("market.arrow.tmp").exists());
}
