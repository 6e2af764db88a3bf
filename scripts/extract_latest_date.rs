use fiflow_crawler::store::arrow_store::MARKET_FILE;
use fiflow_crawler::util::{arrow_utils, parse_iso_date};

use chrono::Datelike;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let data_dir = std::env::var("FIFLOW_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let arrow_path = Path::new(&data_dir).join(MARKET_FILE);
    if !arrow_path.exists() {
        anyhow::bail!(
            "{} 不存在，请先运行 'cargo run -- crawl --symbols <代码>'",
            arrow_path.display()
        );
    }

    // 查找最新交易日期
    let mut latest: Option<String> = None;
    for batch in arrow_utils::read_record_batches(&arrow_path)? {
        for row in arrow_utils::market_rows_from_record_batch(&batch)? {
            if latest.as_ref().map_or(true, |d| row.date > *d) {
                latest = Some(row.date);
            }
        }
    }

    match latest {
        Some(date) => {
            let date = parse_iso_date(&date)?;
            println!("最新交易日期: {}", date);
            // YYYY.M.D 版本号（无前导零）
            println!("版本号: {}.{}.{}", date.year(), date.month(), date.day());
        }
        None => println!("未找到有效的日期"),
    }

    Ok(())
}
