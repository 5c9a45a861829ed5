//! 情报源适配器 Trait 与公共 HTTP 处理

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::FeedError;
use crate::rule::Rule;
use crate::utils::preview_bytes;

/// 解析失败时响应体预览长度
const PAYLOAD_PREVIEW_LEN: usize = 200;

/// 单次拉取的请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub url: Url,
    pub api_key: Option<String>,
    /// 本次最多生成的规则数
    pub max_records: usize,
}

/// 情报源原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeedPayload {
    pub provider: String,
    pub body: Vec<u8>,
}

impl RawFeedPayload {
    pub fn new(provider: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            provider: provider.into(),
            body: body.into(),
        }
    }

    /// 按 JSON 解析响应体，失败时附带响应体预览
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, FeedError> {
        serde_json::from_slice(&self.body).map_err(|e| FeedError::FeedParseError {
            provider: self.provider.clone(),
            reason: format!("{} (body: {})", e, preview_bytes(&self.body, PAYLOAD_PREVIEW_LEN)),
        })
    }
}

/// 情报源适配器：拉取原始数据并归一化为规则
#[async_trait]
pub trait FeedAdapter: fmt::Debug + Send + Sync {
    /// 情报源名称（用于诊断与规则来源）
    fn name(&self) -> &str;

    async fn fetch(&self, client: &Client, request: &FeedRequest) -> Result<RawFeedPayload, FeedError>;

    /// 归一化：至多返回 `max_records` 条规则
    fn normalize(&self, payload: &RawFeedPayload, max_records: usize) -> Result<Vec<Rule>, FeedError>;
}

/// 发送请求并读取响应体；非 200 状态码视为失败
pub(crate) async fn send_and_read(provider: &str, request: RequestBuilder) -> Result<RawFeedPayload, FeedError> {
    let response = request.send().await.map_err(|e| FeedError::FeedFetchError {
        provider: provider.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FeedError::FeedStatusError {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|e| FeedError::FeedFetchError {
        provider: provider.to_string(),
        reason: format!("failed to read body: {}", e),
    })?;
    debug!("[{}] response size={} bytes", provider, body.len());

    Ok(RawFeedPayload::new(provider, body.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_parse_json_error_carries_preview() {
        let payload = RawFeedPayload::new("custom", "<html>\n  <title>502 Bad Gateway</title>");
        let err = payload.parse_json::<Value>().unwrap_err();
        match err {
            FeedError::FeedParseError { provider, reason } => {
                assert_eq!(provider, "custom");
                assert!(reason.contains("<html> <title>502 Bad Gateway</title>"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
