use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 指数代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndexCode {
    #[serde(rename = "KOSPI")]
    Kospi,
    #[serde(rename = "KOSDAQ")]
    Kosdaq,
    #[serde(rename = "KPI200")]
    Kpi200,
}

impl IndexCode {
    pub const ALL: [IndexCode; 3] = [IndexCode::Kospi, IndexCode::Kosdaq, IndexCode::Kpi200];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexCode::Kospi => "KOSPI",
            IndexCode::Kosdaq => "KOSDAQ",
            IndexCode::Kpi200 => "KPI200",
        }
    }
}

impl fmt::Display for IndexCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        IndexCode::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or_else(|| format!("Unknown index code: {}", s))
    }
}

/// 实时接口解码后的指数数值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    pub value: f64,
    pub change: f64,
    pub change_rate: f64,
}

/// 某指数某日的快照，键为 (name, date)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub name: IndexCode,
    pub date: String,
    pub value: f64,
    pub change: f64,
    pub change_rate: f64,
}

impl IndexRecord {
    pub fn new(name: IndexCode, date: &str, snapshot: IndexSnapshot) -> Self {
        Self {
            name,
            date: date.to_string(),
            value: snapshot.value,
            change: snapshot.change,
            change_rate: snapshot.change_rate,
        }
    }
}
