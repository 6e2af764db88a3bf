use serde::Serialize;

/// 外国人净买入保留的天数
pub const FLOW_DAYS: usize = 8;

/// 价格变动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// 将幅度与方向合成带符号的变动值，平盘时恒为 0；`i64::MIN` 无法取绝对值，返回 `None`
    pub fn apply(self, magnitude: i64) -> Option<i64> {
        match self {
            Direction::Up => magnitude.checked_abs(),
            Direction::Down => magnitude.checked_abs().map(|m| -m),
            Direction::Flat => Some(0),
        }
    }

    pub fn apply_f64(self, magnitude: f64) -> f64 {
        match self {
            Direction::Up => magnitude.abs(),
            Direction::Down => -magnitude.abs(),
            Direction::Flat => 0.0,
        }
    }
}

/// 当前行情
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub price: i64,
    pub change: i64,
    pub change_rate: f64,
}

impl Quote {
    /// 根据现价和涨跌额推算涨跌幅，溢出时返回 `None`
    pub fn derive(price: i64, change: i64) -> Option<Self> {
        Some(Self {
            price,
            change,
            change_rate: derive_change_rate(price, change)?,
        })
    }
}

/// 前收盘 = 现价 - 涨跌额；前收盘为 0 时涨跌幅为 0
pub fn derive_change_rate(price: i64, change: i64) -> Option<f64> {
    let prior_close = price.checked_sub(change)?;
    if prior_close == 0 {
        return Some(0.0);
    }
    Some(round2(change as f64 / prior_close as f64 * 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 单日外国人净买入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignerDay {
    pub date: String,
    pub net_buy: i64,
}

/// 最近 8 个交易日的外国人净买入，最新在前。
///
/// 日期与数量成对保存，只在写入存储时展开成两个平行列表。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignerFlow {
    days: [ForeignerDay; FLOW_DAYS],
}

impl Default for ForeignerFlow {
    fn default() -> Self {
        Self::empty()
    }
}

impl ForeignerFlow {
    /// 8 个 (0, "") 占位
    pub fn empty() -> Self {
        Self {
            days: std::array::from_fn(|_| ForeignerDay::default()),
        }
    }

    /// 取前 8 条，不足时在右侧补 (0, "")
    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = ForeignerDay>,
    {
        let mut flow = Self::empty();
        for (slot, day) in flow.days.iter_mut().zip(days) {
            *slot = day;
        }
        flow
    }

    pub fn days(&self) -> &[ForeignerDay] {
        &self.days
    }

    pub fn net_buys(&self) -> Vec<i64> {
        self.days.iter().map(|d| d.net_buy).collect()
    }

    pub fn dates(&self) -> Vec<String> {
        self.days.iter().map(|d| d.date.clone()).collect()
    }

    /// 有日期的天数
    pub fn filled(&self) -> usize {
        self.days.iter().filter(|d| !d.date.is_empty()).count()
    }
}

/// 单只股票某日的行情快照，键为 (symbol, date)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    pub symbol: String,
    pub date: String,
    pub price: i64,
    pub change: i64,
    pub change_rate: f64,
    pub stock_name: String,
    pub foreigner_flow: ForeignerFlow,
}

impl MarketRecord {
    pub fn new(symbol: &str, date: &str, quote: Quote, stock_name: String, foreigner_flow: ForeignerFlow) -> Self {
        Self {
            symbol: symbol.to_string(),
            date: date.to_string(),
            price: quote.price,
            change: quote.change,
            change_rate: quote.change_rate,
            stock_name,
            foreigner_flow,
        }
    }
}
