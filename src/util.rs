use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Timelike, Utc, Weekday};
use chrono_tz::{Asia::Seoul, Tz};
use regex::Regex;
use std::sync::LazyLock;
use crate::errors::{Result, CrawlerError};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));

// 数字文本工具

/// 去掉千分位逗号和空白
pub fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect()
}

/// "1,234" / "-5,678" / "+90" => 整数
pub fn parse_int(text: &str) -> Option<i64> {
    strip_separators(text).parse::<i64>().ok()
}

/// 取文本中第一段连续数字，忽略箭头、"상승" 等前后缀
pub fn first_digits(text: &str) -> Option<i64> {
    let cleaned = strip_separators(text);
    DIGITS
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

// 日期工具

/// "2025.08.05" => "2025-08-05"，无法识别时仅替换分隔符
pub fn normalize_date(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    NaiveDate::parse_from_str(trimmed, "%Y.%m.%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| trimmed.replace('.', "-"))
}

pub fn parse_iso_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(CrawlerError::from)
}

pub fn seoul_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&Seoul)
}

/// 韩国时间的当天日期
pub fn seoul_today() -> NaiveDate {
    seoul_now().date_naive()
}

/// 存储用时间戳，UTC，`Z` 结尾
pub fn utc_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 工作日 09:00~16:00（韩国时间，含边界）
pub fn is_market_open(now: &DateTime<Tz>) -> bool {
    if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let hhmm = now.hour() * 100 + now.minute();
    (900..=1600).contains(&hhmm)
}

// Arrow数据转换工具
pub mod arrow_utils {
    use super::*;
    use crate::store::{IndexRow, MarketRow};
    use arrow_array::builder::{Float64Builder, Int64Builder, ListBuilder, StringBuilder};
    use arrow_array::{Array, ArrayRef, Float64Array, Int64Array, ListArray, RecordBatch, StringArray};
    use arrow_ipc::reader::FileReader;
    use arrow_ipc::writer::FileWriter;
    use arrow_schema::{Field, Schema};
    use log::debug;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;

    // 按列名和数组类型生成 Schema，避免手写 list 字段类型
    fn record_batch(columns: Vec<(&str, ArrayRef)>) -> Result<RecordBatch> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), false))
            .collect();
        let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, array)| array).collect();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }

    fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<T>())
            .ok_or_else(|| CrawlerError::ArrowError(format!("Missing or mistyped column: {}", name)))
    }

    fn list_i64(list: &ListArray, i: usize) -> Result<Vec<i64>> {
        let values = list.value(i);
        let ints = values
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| CrawlerError::ArrowError("Failed to downcast i64 list".to_string()))?;
        Ok((0..ints.len()).map(|j| ints.value(j)).collect())
    }

    fn list_string(list: &ListArray, i: usize) -> Result<Vec<String>> {
        let values = list.value(i);
        let strings = values
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| CrawlerError::ArrowError("Failed to downcast string list".to_string()))?;
        Ok((0..strings.len()).map(|j| strings.value(j).to_string()).collect())
    }

    // 将行情行转换为Arrow记录批次
    pub fn market_rows_to_record_batch(rows: &[MarketRow]) -> Result<RecordBatch> {
        let mut pk = StringBuilder::new();
        let mut sk = StringBuilder::new();
        let mut symbol_date = StringBuilder::new();
        let mut symbol = StringBuilder::new();
        let mut date = StringBuilder::new();
        let mut price = Int64Builder::new();
        let mut change = Int64Builder::new();
        let mut change_rate = Float64Builder::new();
        let mut stock_name = StringBuilder::new();
        let mut net_buy = ListBuilder::new(Int64Builder::new());
        let mut net_buy_date = ListBuilder::new(StringBuilder::new());
        let mut created_at = StringBuilder::new();
        let mut updated_at = StringBuilder::new();

        for row in rows {
            pk.append_value(&row.pk);
            sk.append_value(&row.sk);
            symbol_date.append_value(&row.symbol_date);
            symbol.append_value(&row.symbol);
            date.append_value(&row.date);
            price.append_value(row.price);
            change.append_value(row.change);
            change_rate.append_value(row.change_rate);
            stock_name.append_value(&row.stock_name);
            for v in &row.foreigner_net_buy {
                net_buy.values().append_value(*v);
            }
            net_buy.append(true);
            for d in &row.foreigner_net_buy_date {
                net_buy_date.values().append_value(d);
            }
            net_buy_date.append(true);
            created_at.append_value(&row.created_at);
            updated_at.append_value(&row.updated_at);
        }

        record_batch(vec![
            ("pk", Arc::new(pk.finish()) as ArrayRef),
            ("sk", Arc::new(sk.finish()) as ArrayRef),
            ("symbol_date", Arc::new(symbol_date.finish()) as ArrayRef),
            ("symbol", Arc::new(symbol.finish()) as ArrayRef),
            ("date", Arc::new(date.finish()) as ArrayRef),
            ("price", Arc::new(price.finish()) as ArrayRef),
            ("change", Arc::new(change.finish()) as ArrayRef),
            ("changeRate", Arc::new(change_rate.finish()) as ArrayRef),
            ("stockName", Arc::new(stock_name.finish()) as ArrayRef),
            ("foreignerNetBuy", Arc::new(net_buy.finish()) as ArrayRef),
            ("foreignerNetBuyDate", Arc::new(net_buy_date.finish()) as ArrayRef),
            ("createdAt", Arc::new(created_at.finish()) as ArrayRef),
            ("updatedAt", Arc::new(updated_at.finish()) as ArrayRef),
        ])
    }

    pub fn market_rows_from_record_batch(batch: &RecordBatch) -> Result<Vec<MarketRow>> {
        let pk = column::<StringArray>(batch, "pk")?;
        let sk = column::<StringArray>(batch, "sk")?;
        let symbol_date = column::<StringArray>(batch, "symbol_date")?;
        let symbol = column::<StringArray>(batch, "symbol")?;
        let date = column::<StringArray>(batch, "date")?;
        let price = column::<Int64Array>(batch, "price")?;
        let change = column::<Int64Array>(batch, "change")?;
        let change_rate = column::<Float64Array>(batch, "changeRate")?;
        let stock_name = column::<StringArray>(batch, "stockName")?;
        let net_buy = column::<ListArray>(batch, "foreignerNetBuy")?;
        let net_buy_date = column::<ListArray>(batch, "foreignerNetBuyDate")?;
        let created_at = column::<StringArray>(batch, "createdAt")?;
        let updated_at = column::<StringArray>(batch, "updatedAt")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(MarketRow {
                pk: pk.value(i).to_string(),
                sk: sk.value(i).to_string(),
                symbol_date: symbol_date.value(i).to_string(),
                symbol: symbol.value(i).to_string(),
                date: date.value(i).to_string(),
                price: price.value(i),
                change: change.value(i),
                change_rate: change_rate.value(i),
                stock_name: stock_name.value(i).to_string(),
                foreigner_net_buy: list_i64(net_buy, i)?,
                foreigner_net_buy_date: list_string(net_buy_date, i)?,
                created_at: created_at.value(i).to_string(),
                updated_at: updated_at.value(i).to_string(),
            });
        }
        Ok(rows)
    }

    // 将指数行转换为Arrow记录批次
    pub fn index_rows_to_record_batch(rows: &[IndexRow]) -> Result<RecordBatch> {
        let mut pk = StringBuilder::new();
        let mut sk = StringBuilder::new();
        let mut index_name_date = StringBuilder::new();
        let mut name = StringBuilder::new();
        let mut date = StringBuilder::new();
        let mut value = Float64Builder::new();
        let mut change = Float64Builder::new();
        let mut change_rate = Float64Builder::new();
        let mut created_at = StringBuilder::new();
        let mut updated_at = StringBuilder::new();

        for row in rows {
            pk.append_value(&row.pk);
            sk.append_value(&row.sk);
            index_name_date.append_value(&row.index_name_date);
            name.append_value(&row.name);
            date.append_value(&row.date);
            value.append_value(row.value);
            change.append_value(row.change);
            change_rate.append_value(row.change_rate);
            created_at.append_value(&row.created_at);
            updated_at.append_value(&row.updated_at);
        }

        record_batch(vec![
            ("pk", Arc::new(pk.finish()) as ArrayRef),
            ("sk", Arc::new(sk.finish()) as ArrayRef),
            ("index_name_date", Arc::new(index_name_date.finish()) as ArrayRef),
            ("name", Arc::new(name.finish()) as ArrayRef),
            ("date", Arc::new(date.finish()) as ArrayRef),
            ("value", Arc::new(value.finish()) as ArrayRef),
            ("change", Arc::new(change.finish()) as ArrayRef),
            ("changeRate", Arc::new(change_rate.finish()) as ArrayRef),
            ("createdAt", Arc::new(created_at.finish()) as ArrayRef),
            ("updatedAt", Arc::new(updated_at.finish()) as ArrayRef),
        ])
    }

    pub fn index_rows_from_record_batch(batch: &RecordBatch) -> Result<Vec<IndexRow>> {
        let pk = column::<StringArray>(batch, "pk")?;
        let sk = column::<StringArray>(batch, "sk")?;
        let index_name_date = column::<StringArray>(batch, "index_name_date")?;
        let name = column::<StringArray>(batch, "name")?;
        let date = column::<StringArray>(batch, "date")?;
        let value = column::<Float64Array>(batch, "value")?;
        let change = column::<Float64Array>(batch, "change")?;
        let change_rate = column::<Float64Array>(batch, "changeRate")?;
        let created_at = column::<StringArray>(batch, "createdAt")?;
        let updated_at = column::<StringArray>(batch, "updatedAt")?;

        Ok((0..batch.num_rows())
            .map(|i| IndexRow {
                pk: pk.value(i).to_string(),
                sk: sk.value(i).to_string(),
                index_name_date: index_name_date.value(i).to_string(),
                name: name.value(i).to_string(),
                date: date.value(i).to_string(),
                value: value.value(i),
                change: change.value(i),
                change_rate: change_rate.value(i),
                created_at: created_at.value(i).to_string(),
                updated_at: updated_at.value(i).to_string(),
            })
            .collect())
    }

    /// 先写临时文件再改名，写入中途失败不会破坏原文件
    pub fn save_record_batch(batch: &RecordBatch, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("arrow.tmp");
        if let Err(e) = write_and_rename(batch, &tmp_path, path) {
            if tmp_path.exists() {
                let _ = fs::remove_file(&tmp_path);
            }
            return Err(e);
        }

        debug!("Saved {} rows to {}", batch.num_rows(), path.display());
        Ok(())
    }

    fn write_and_rename(batch: &RecordBatch, tmp_path: &Path, path: &Path) -> Result<()> {
        {
            let file = File::create(tmp_path)?;
            let mut writer = FileWriter::try_new(file, &batch.schema())?;
            writer.write(batch)?;
            writer.finish()?;
        }
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    // 从Arrow文件读取全部批次
    pub fn read_record_batches(path: &Path) -> Result<Vec<RecordBatch>> {
        let file = File::open(path)?;
        let reader = FileReader::try_new(file, None)?;
        reader.map(|batch| batch.map_err(CrawlerError::from)).collect()
    }

    /// 以 NDJSON 输出
    pub fn write_ndjson<W: Write>(batch: &RecordBatch, out: W) -> Result<()> {
        let mut writer = arrow_json::LineDelimitedWriter::new(out);
        writer.write_batches(&[batch])?;
        writer.finish()?;
        Ok(())
    }
}
