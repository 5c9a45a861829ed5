//! 威胁脉冲情报源（OTX pulses）
//! 每个脉冲生成一条规则，目标类型由首个指标类型决定

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::adapter::{send_and_read, FeedAdapter, FeedRequest, RawFeedPayload};
use super::FeedSource;
use crate::error::FeedError;
use crate::model::ElementKind;
use crate::rule::{Rule, RuleTarget, SeverityLabel};

const API_KEY_HEADER: &str = "X-OTX-API-KEY";
/// 建议中列出的指标数上限
const LISTED_INDICATORS: usize = 3;

#[derive(Debug, Deserialize)]
struct PulseResponse {
    #[serde(default)]
    results: Vec<Pulse>,
}

#[derive(Debug, Deserialize)]
struct Pulse {
    name: String,
    #[serde(default)]
    indicators: Vec<Indicator>,
}

#[derive(Debug, Deserialize)]
struct Indicator {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    indicator: String,
}

/// 指标类型 → 规则目标
pub fn target_for_indicator(kind: &str) -> RuleTarget {
    let element = match kind.trim().to_ascii_lowercase().as_str() {
        "url" | "uri" => ElementKind::WebApp,
        "domain" | "hostname" => ElementKind::LoadBalancer,
        "ipv4" | "ipv6" | "cidr" => ElementKind::Firewall,
        "filehash-md5" | "filehash-sha1" | "filehash-sha256" => ElementKind::AwsS3,
        "email" => ElementKind::Api,
        _ => return RuleTarget::Dataflow,
    };
    RuleTarget::Element(element)
}

/// 脉冲情报源
#[derive(Debug, Clone, Default)]
pub struct PulseFeed;

#[async_trait]
impl FeedAdapter for PulseFeed {
    fn name(&self) -> &str {
        FeedSource::Pulse.id()
    }

    async fn fetch(&self, client: &Client, request: &FeedRequest) -> Result<RawFeedPayload, FeedError> {
        let mut builder = client.get(request.url.clone());
        if let Some(key) = &request.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        send_and_read(self.name(), builder).await
    }

    fn normalize(&self, payload: &RawFeedPayload, max_records: usize) -> Result<Vec<Rule>, FeedError> {
        let response: PulseResponse = payload.parse_json()?;

        let rules = response
            .results
            .iter()
            .take(max_records)
            .map(|pulse| {
                let target = pulse
                    .indicators
                    .first()
                    .map(|indicator| target_for_indicator(&indicator.kind))
                    .unwrap_or(RuleTarget::Dataflow);

                let listed: Vec<&str> = pulse
                    .indicators
                    .iter()
                    .take(LISTED_INDICATORS)
                    .map(|indicator| indicator.indicator.as_str())
                    .filter(|value| !value.is_empty())
                    .collect();
                let recommendation = if listed.is_empty() {
                    "Review the pulse and monitor for related activity.".to_string()
                } else {
                    format!("Block or monitor indicators: {}", listed.join(", "))
                };

                Rule::from_feed(
                    self.name(),
                    target,
                    format!("Threat pulse: {}", pulse.name),
                    recommendation,
                    SeverityLabel::Medium,
                )
            })
            .collect();
        Ok(rules)
    }
}
