//! 攻击模式情报源（STIX 格式的 CAPEC 攻击模式库）

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::adapter::{send_and_read, FeedAdapter, FeedRequest, RawFeedPayload};
use super::FeedSource;
use crate::error::FeedError;
use crate::model::ElementKind;
use crate::rule::{Rule, RuleTarget, SeverityLabel};
use crate::utils::preview_compact;

const ATTACK_PATTERN_TYPE: &str = "attack-pattern";
const RECOMMENDATION_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct StixBundle {
    #[serde(default)]
    objects: Vec<StixObject>,
}

#[derive(Debug, Deserialize)]
struct StixObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    revoked: bool,
    #[serde(default)]
    x_capec_status: Option<String>,
    #[serde(default)]
    external_references: Vec<ExternalReference>,
}

#[derive(Debug, Deserialize)]
struct ExternalReference {
    #[serde(default)]
    external_id: Option<String>,
}

impl StixObject {
    fn is_active_pattern(&self) -> bool {
        self.kind == ATTACK_PATTERN_TYPE
            && !self.revoked
            && !self
                .x_capec_status
                .as_deref()
                .is_some_and(|status| status.eq_ignore_ascii_case("deprecated"))
            && self.name.is_some()
    }

    fn external_id(&self) -> Option<&str> {
        self.external_references
            .iter()
            .find_map(|reference| reference.external_id.as_deref())
    }
}

/// 攻击模式情报源：模式统一映射到 Web 应用
#[derive(Debug, Clone, Default)]
pub struct AttackPatternFeed;

#[async_trait]
impl FeedAdapter for AttackPatternFeed {
    fn name(&self) -> &str {
        FeedSource::AttackPattern.id()
    }

    async fn fetch(&self, client: &Client, request: &FeedRequest) -> Result<RawFeedPayload, FeedError> {
        send_and_read(self.name(), client.get(request.url.clone())).await
    }

    fn normalize(&self, payload: &RawFeedPayload, max_records: usize) -> Result<Vec<Rule>, FeedError> {
        let bundle: StixBundle = payload.parse_json()?;

        let rules = bundle
            .objects
            .iter()
            .filter(|object| object.is_active_pattern())
            .take(max_records)
            .map(|object| {
                let name = object.name.as_deref().unwrap_or_default();
                let description = match object.external_id() {
                    Some(id) => format!("{}: {}", id, name),
                    None => name.to_string(),
                };
                let recommendation = match object.description.as_deref() {
                    Some(text) if !text.trim().is_empty() => {
                        format!("Review mitigations for: {}", preview_compact(text, RECOMMENDATION_LEN))
                    }
                    _ => "Review the attack pattern and apply the documented mitigations.".to_string(),
                };
                Rule::from_feed(
                    self.name(),
                    RuleTarget::Element(ElementKind::WebApp),
                    description,
                    recommendation,
                    SeverityLabel::Medium,
                )
            })
            .collect();
        Ok(rules)
    }
}
