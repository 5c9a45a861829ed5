//! 自定义情报源：调用方提供的 JSON 地址
//!
//! 支持两种载荷：顶层数组，或 `{"threats": [...]}`。每条记录：
//! `{name | description, recommendation?, severity?, stride?}`

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::adapter::{send_and_read, FeedAdapter, FeedRequest, RawFeedPayload};
use super::FeedSource;
use crate::error::FeedError;
use crate::rule::{Rule, RuleSeverity, RuleTarget, SeverityLabel, SeverityValue};
use crate::utils::{preview_compact, DIAGNOSTIC_PREVIEW_LEN};

const API_KEY_HEADER: &str = "X-API-Key";
const DEFAULT_RECOMMENDATION: &str = "Inspect traffic on this flow for the reported threat.";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CustomPayload {
    List(Vec<Value>),
    Wrapped { threats: Vec<Value> },
}

#[derive(Debug, Deserialize)]
struct CustomThreat {
    #[serde(default, alias = "title")]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    severity: Option<Value>,
    #[serde(default)]
    stride: Option<String>,
}

/// 等级名或分数；缺失或无法识别时按 High 处理
fn custom_severity(value: Option<Value>) -> RuleSeverity {
    match value.map(serde_json::from_value::<SeverityValue>) {
        Some(Ok(SeverityValue::Score(score))) => RuleSeverity::Score(score),
        Some(Ok(SeverityValue::Label(label))) => {
            RuleSeverity::Label(label.parse().unwrap_or(SeverityLabel::High))
        }
        _ => RuleSeverity::Label(SeverityLabel::High),
    }
}

/// 自定义情报源：威胁统一映射到数据流
#[derive(Debug, Clone, Default)]
pub struct CustomFeed;

#[async_trait]
impl FeedAdapter for CustomFeed {
    fn name(&self) -> &str {
        FeedSource::Custom.id()
    }

    async fn fetch(&self, client: &Client, request: &FeedRequest) -> Result<RawFeedPayload, FeedError> {
        let mut builder = client.get(request.url.clone());
        if let Some(key) = &request.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        send_and_read(self.name(), builder).await
    }

    fn normalize(&self, payload: &RawFeedPayload, max_records: usize) -> Result<Vec<Rule>, FeedError> {
        let threats = match payload.parse_json::<CustomPayload>()? {
            CustomPayload::List(threats) | CustomPayload::Wrapped { threats } => threats,
        };

        let rules = threats
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let preview = preview_compact(&record.to_string(), DIAGNOSTIC_PREVIEW_LEN).to_string();
                match serde_json::from_value::<CustomThreat>(record) {
                    Ok(threat) => Some(threat),
                    Err(e) => {
                        warn!("[{}] record #{} skipped: {} ({})", self.name(), index, e, preview);
                        None
                    }
                }
            })
            .filter_map(|threat| {
                let description = threat
                    .name
                    .clone()
                    .or_else(|| threat.description.clone())
                    .filter(|text| !text.trim().is_empty());
                if description.is_none() {
                    debug!("[{}] record without name/description skipped", self.name());
                }
                Some((description?, threat))
            })
            .take(max_records)
            .map(|(description, threat)| {
                let mut rule = Rule::from_feed(
                    self.name(),
                    RuleTarget::Dataflow,
                    description,
                    threat
                        .recommendation
                        .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
                    SeverityLabel::High,
                );
                rule.severity = custom_severity(threat.severity);
                match threat.stride.filter(|s| !s.trim().is_empty()) {
                    Some(stride) => rule.with_stride(stride),
                    None => rule,
                }
            })
            .collect();
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::DEFAULT_STRIDE;

    #[test]
    fn test_list_and_wrapped_payloads() {
        let list = r#"[
            {"name": "C2 beaconing", "severity": "low", "stride": "Information Disclosure"},
            {"description": "Credential stuffing", "recommendation": "Rate limit logins", "severity": "critical"},
            {"severity": "High"}
        ]"#;
        let rules = CustomFeed.normalize(&RawFeedPayload::new("custom", list), 5).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].severity.label(), SeverityLabel::Low);
        assert_eq!(rules[0].stride, "Information Disclosure");
        assert_eq!(rules[0].recommendation, DEFAULT_RECOMMENDATION);
        assert_eq!(rules[1].severity.label(), SeverityLabel::High);
        assert_eq!(rules[1].stride, DEFAULT_STRIDE);
        assert!(rules.iter().all(|r| r.target == RuleTarget::Dataflow));

        let wrapped = r#"{"threats": [{"title": "Data exfiltration"}]}"#;
        let rules = CustomFeed.normalize(&RawFeedPayload::new("custom", wrapped), 5).unwrap();
        assert_eq!(rules[0].description, "Data exfiltration");
    }

    #[test]
    fn test_numeric_and_malformed_records() {
        let list = r#"[
            {"name": "C2 beaconing", "severity": "Low"},
            {"name": "Exfil", "severity": 7},
            {"name": "Port scan", "severity": 5},
            {"name": "Odd severity", "severity": -3},
            {"name": ["not", "a", "string"]},
            "garbage",
            {"name": "Tunnel", "severity": {"level": "low"}}
        ]"#;
        let rules = CustomFeed.normalize(&RawFeedPayload::new("custom", list), 10).unwrap();

        let severities: Vec<_> = rules
            .iter()
            .map(|r| (r.description.as_str(), r.severity.label(), r.severity.score()))
            .collect();
        assert_eq!(
            severities,
            vec![
                ("C2 beaconing", SeverityLabel::Low, None),
                ("Exfil", SeverityLabel::High, Some(7)),
                ("Port scan", SeverityLabel::Medium, Some(5)),
                ("Odd severity", SeverityLabel::High, None),
                ("Tunnel", SeverityLabel::High, None),
            ]
        );
    }

    #[test]
    fn test_unexpected_shape_is_parse_error() {
        let payload = RawFeedPayload::new("custom", r#"{"items": 3}"#);
        assert!(matches!(
            CustomFeed.normalize(&payload, 5),
            Err(FeedError::FeedParseError { .. })
        ));
    }
}
