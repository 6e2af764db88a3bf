//! 字段提取：抓取内容 → 类型化的值。
//!
//! 所有函数都是同步纯函数，解析失败、字段缺失、类型转换失败统一返回 `None`（未找到），
//! 不向外抛错。`Html` 不是 `Send`，只在这些函数内部存在，不会跨 `.await`。

use crate::models::index::{IndexCode, IndexSnapshot};
use crate::models::market::{Direction, ForeignerDay, ForeignerFlow, Quote, FLOW_DAYS};
use crate::scrapers::locators::{HtmlLocators, JsonLocators, INDEX_FIXED_POINT};
use crate::util::{first_digits, normalize_date, parse_int};
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!("Invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    let text = doc.select(&sel).next().map(element_text);
    if text.is_none() {
        debug!("No element matches {:?}", css);
    }
    text
}

/// 根据方向标记判断涨跌，找不到标记视为平盘
pub fn detect_direction(text: &str) -> Direction {
    if text.contains("상한가") || text.contains("상승") || text.contains('▲') {
        Direction::Up
    } else if text.contains("하한가") || text.contains("하락") || text.contains('▼') {
        Direction::Down
    } else {
        Direction::Flat
    }
}

/// 行情页：现价、带符号涨跌额、推算的涨跌幅
pub fn extract_quote(html: &str, loc: &HtmlLocators) -> Option<Quote> {
    let doc = Html::parse_document(html);

    let price = first_text(&doc, loc.price)
        .and_then(|t| parse_int(&t))
        .filter(|p| *p >= 0)?;

    let direction = first_text(&doc, loc.direction)
        .map(|t| detect_direction(&t))
        .unwrap_or(Direction::Flat);

    let change = match direction {
        Direction::Flat => 0,
        _ => {
            let magnitude = first_text(&doc, loc.change).and_then(|t| first_digits(&t))?;
            direction.apply(magnitude)?
        }
    };

    Quote::derive(price, change)
}

/// 主页：固定位置上的第一个文本节点
pub fn extract_stock_name(html: &str, loc: &HtmlLocators) -> Option<String> {
    let doc = Html::parse_document(html);
    first_text(&doc, loc.stock_name).filter(|name| !name.is_empty())
}

/// 外国人页：前 8 个数据行的 (日期, 净买入)。
///
/// 某行解析失败记为 (0, "")，不影响其他行；结果始终补齐到 8 个。
pub fn extract_foreigner_flow(html: &str, loc: &HtmlLocators) -> Option<ForeignerFlow> {
    let rows = selector(loc.flow_rows)?;
    let cell = selector(loc.flow_cell)?;
    let doc = Html::parse_document(html);

    let days: Vec<ForeignerDay> = doc
        .select(&rows)
        .take(FLOW_DAYS)
        .map(|row| {
            let cells: Vec<String> = row.select(&cell).map(element_text).collect();
            let date = cells.get(loc.flow_date_column);
            let net_buy = cells.get(loc.flow_net_buy_column).and_then(|t| parse_int(t));
            match (date, net_buy) {
                (Some(date), Some(net_buy)) => ForeignerDay {
                    date: normalize_date(date),
                    net_buy,
                },
                _ => ForeignerDay::default(),
            }
        })
        .collect();

    debug!("Found {} foreigner rows", days.len());
    Some(ForeignerFlow::from_days(days))
}

fn at_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |cur, key| cur.get(*key))
}

// 数字字段可能是数值也可能是字符串
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn area_items<'a>(root: &'a Value, loc: &JsonLocators) -> Option<&'a Vec<Value>> {
    at_path(root, loc.areas)?
        .as_array()?
        .iter()
        .find(|a| a.get(loc.area_name).and_then(Value::as_str) == Some(loc.index_area))
        .and_then(|a| a.get(loc.area_items))
        .and_then(Value::as_array)
}

/// 指数实时接口：nv / cv 除以 100，cr 原样
pub fn extract_index_snapshot(json: &str, code: IndexCode, loc: &JsonLocators) -> Option<IndexSnapshot> {
    let root: Value = serde_json::from_str(json).ok()?;
    let item = area_items(&root, loc)?
        .iter()
        .find(|item| {
            item.get(loc.code)
                .and_then(Value::as_str)
                .map(|cd| cd.eq_ignore_ascii_case(code.as_str()))
                .unwrap_or(false)
        })?;

    Some(IndexSnapshot {
        value: number(item.get(loc.value)?)? / INDEX_FIXED_POINT,
        change: number(item.get(loc.change)?)? / INDEX_FIXED_POINT,
        change_rate: number(item.get(loc.change_rate)?)?,
    })
}

/// 方向代码：1 上限、2 上涨、3 平盘、4 下限、5 下跌
fn direction_code(code: &str) -> Option<Direction> {
    match code.trim() {
        "1" | "2" => Some(Direction::Up),
        "3" => Some(Direction::Flat),
        "4" | "5" => Some(Direction::Down),
        _ => None,
    }
}

/// 个股实时接口：第一个区域的第一项
pub fn extract_realtime_quote(json: &str, loc: &JsonLocators) -> Option<Quote> {
    let root: Value = serde_json::from_str(json).ok()?;
    let item = at_path(&root, loc.areas)?
        .get(0)?
        .get(loc.area_items)?
        .get(0)?;

    let price = number(item.get(loc.value)?)?;
    if price < 0.0 {
        return None;
    }
    let change = number(item.get(loc.change)?)?;
    let rate = number(item.get(loc.change_rate)?)?;

    let direction = item
        .get(loc.direction)
        .and_then(text)
        .and_then(|c| direction_code(&c));
    // `as` 在越界时饱和到 i64::MIN/MAX，由 apply 拒绝 MIN
    let change = change.round() as i64;
    let (change, rate) = match direction {
        Some(d) => (d.apply(change)?, d.apply_f64(rate)),
        None => (change, rate),
    };

    Some(Quote {
        price: price.round() as i64,
        change,
        change_rate: rate,
    })
}
