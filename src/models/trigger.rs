use serde::{Deserialize, Serialize};

/// 触发负载：`{ symbols?: [..], indices?: [..] }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerEvent {
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default)]
    pub indices: Option<Vec<String>>,
}

/// 待抓取的股票，`name_hint` 为存储中的旧名称，仅作兜底
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTarget {
    pub symbol: String,
    pub name_hint: Option<String>,
}

impl SymbolTarget {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name_hint: None,
        }
    }

    pub fn with_hint(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name_hint: Some(name.to_string()).filter(|n| !n.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    pub target: String,
    pub status: Status,
}

impl TargetStatus {
    pub fn success(target: &str) -> Self {
        Self { target: target.to_string(), status: Status::Success }
    }

    pub fn failed(target: &str) -> Self {
        Self { target: target.to_string(), status: Status::Failed }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Statuses(Vec<TargetStatus>),
    Error { error: String },
}

/// 返回给调用方的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: ResponseBody,
}

impl TriggerResponse {
    pub fn ok(statuses: Vec<TargetStatus>) -> Self {
        Self { status_code: 200, body: ResponseBody::Statuses(statuses) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status_code: 500, body: ResponseBody::Error { error: message.into() } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_fields_are_optional() {
        let event: TriggerEvent = serde_json::from_str("{}").unwrap();
        assert!(event.symbols.is_none());
        assert!(event.indices.is_none());

        let event: TriggerEvent = serde_json::from_value(json!({ "symbols": ["005930"] })).unwrap();
        assert_eq!(event.symbols, Some(vec!["005930".to_string()]));
    }

    #[test]
    fn response_serializes_to_wire_shape() {
        let ok = TriggerResponse::ok(vec![TargetStatus::success("005930"), TargetStatus::failed("KOSPI")]);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({
                "statusCode": 200,
                "body": [
                    { "target": "005930", "status": "success" },
                    { "target": "KOSPI", "status": "failed" }
                ]
            })
        );

        let err = TriggerResponse::error("store unreachable");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "statusCode": 500, "body": { "error": "store unreachable" } })
        );
    }

    #[test]
    fn blank_hint_is_dropped() {
        assert_eq!(SymbolTarget::with_hint("000660", "  ").name_hint, None);
        assert_eq!(SymbolTarget::with_hint("000660", "SK하이닉스").name_hint.as_deref(), Some("SK하이닉스"));
    }
}
