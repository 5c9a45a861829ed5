//! 恶意样本情报源（MalwareBazaar 最近样本）

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::adapter::{send_and_read, FeedAdapter, FeedRequest, RawFeedPayload};
use super::FeedSource;
use crate::error::FeedError;
use crate::model::ElementKind;
use crate::rule::{Rule, RuleTarget, SeverityLabel};

const API_KEY_HEADER: &str = "Auth-Key";
/// 描述中展示的哈希前缀长度
const HASH_PREFIX_LEN: usize = 12;

#[derive(Debug, Deserialize)]
struct SampleResponse {
    #[serde(default)]
    query_status: Option<String>,
    #[serde(default)]
    data: Option<Vec<Sample>>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    sha256_hash: String,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
}

/// 恶意样本情报源：样本统一映射到计算实例
#[derive(Debug, Clone, Default)]
pub struct MalwareFeed;

#[async_trait]
impl FeedAdapter for MalwareFeed {
    fn name(&self) -> &str {
        FeedSource::Malware.id()
    }

    async fn fetch(&self, client: &Client, request: &FeedRequest) -> Result<RawFeedPayload, FeedError> {
        let mut builder = client
            .post(request.url.clone())
            .form(&[("query", "get_recent"), ("selector", "time")]);
        if let Some(key) = &request.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        send_and_read(self.name(), builder).await
    }

    fn normalize(&self, payload: &RawFeedPayload, max_records: usize) -> Result<Vec<Rule>, FeedError> {
        let response: SampleResponse = payload.parse_json()?;

        // query_status 不是 ok 时 data 通常缺失
        let samples = response.data.ok_or_else(|| FeedError::FeedParseError {
            provider: self.name().to_string(),
            reason: format!(
                "no sample data (query_status: {})",
                response.query_status.as_deref().unwrap_or("missing")
            ),
        })?;

        let rules = samples
            .iter()
            .take(max_records)
            .map(|sample| {
                let family = sample
                    .signature
                    .as_deref()
                    .or(sample.file_type.as_deref())
                    .unwrap_or("unknown family");
                let prefix: String = sample.sha256_hash.chars().take(HASH_PREFIX_LEN).collect();

                Rule::from_feed(
                    self.name(),
                    RuleTarget::Element(ElementKind::AwsEc2),
                    format!("Malware sample: {} ({})", family, prefix),
                    format!(
                        "Scan instances for SHA256 {} and block its distribution channels.",
                        sample.sha256_hash
                    ),
                    SeverityLabel::High,
                )
            })
            .collect();
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::test_server::serve_once;

    const RECENT: &str = r#"{"query_status": "ok", "data": [
        {"sha256_hash": "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
         "signature": "AgentTesla", "file_type": "exe"},
        {"sha256_hash": "fedcba9876543210fedcba9876543210fedcba9876543210fedcba9876543210",
         "signature": null, "file_type": "dll"}
    ]}"#;

    #[test]
    fn test_normalize_samples() {
        let rules = MalwareFeed
            .normalize(&RawFeedPayload::new("malware-feed", RECENT), 5)
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].description, "Malware sample: AgentTesla (0123456789ab)");
        assert_eq!(rules[1].description, "Malware sample: dll (fedcba987654)");
        assert!(rules
            .iter()
            .all(|r| r.target == RuleTarget::Element(ElementKind::AwsEc2) && r.severity.label() == SeverityLabel::High));
    }

    #[test]
    fn test_failed_query_is_parse_error() {
        let payload = RawFeedPayload::new("malware-feed", r#"{"query_status": "unknown_auth_key"}"#);
        let err = MalwareFeed.normalize(&payload, 5).unwrap_err();
        assert!(matches!(err, FeedError::FeedParseError { reason, .. } if reason.contains("unknown_auth_key")));
    }

    #[tokio::test]
    async fn test_fetch_posts_recent_query() {
        let server = serve_once(200, RECENT).await;
        let request = FeedRequest {
            url: server.url.parse().unwrap(),
            api_key: Some("abc".to_string()),
            max_records: 1,
        };
        let payload = MalwareFeed.fetch(&Client::new(), &request).await.unwrap();
        assert_eq!(MalwareFeed.normalize(&payload, request.max_records).unwrap().len(), 1);

        let raw_request = server.request.await.unwrap();
        assert!(raw_request.starts_with("POST /feed"));
        assert!(raw_request.to_ascii_lowercase().contains("auth-key: abc"));
        assert!(raw_request.ends_with("query=get_recent&selector=time"));
    }
}
