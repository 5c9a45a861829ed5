//! 情报源归一化门面
//! 每个情报源一个任务，并发受信号量约束，单源超时与失败互不影响

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use super::adapter::{FeedAdapter, FeedRequest};
use super::{AttackPatternFeed, CustomFeed, FeedConfig, FeedSource, MalwareFeed, PulseFeed};
use crate::config::EngineConfig;
use crate::diagnostic::Diagnostic;
use crate::error::{FeedError, RstResult};
use crate::rule::Rule;

/// 归一化结果：按配置顺序拼接的规则 + 各情报源的诊断
#[derive(Debug, Clone, Default)]
pub struct FeedNormalization {
    pub rules: Vec<Rule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// 情报源归一化器
#[derive(Debug, Clone)]
pub struct FeedNormalizer {
    client: Client,
    config: EngineConfig,
}

impl FeedNormalizer {
    pub fn new(config: EngineConfig) -> RstResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.feed_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// 复用调用方的 HTTP 客户端
    pub fn with_client(client: Client, config: EngineConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 选择适配器并构造请求；未知情报源、缺失或非法的地址均为配置错误
    pub fn resolve(&self, feed: &FeedConfig) -> Result<(Box<dyn FeedAdapter>, FeedRequest), FeedError> {
        let source: FeedSource = feed.source.parse()?;
        let provider = source.id();
        let endpoints = &self.config.endpoints;

        let (adapter, raw_url): (Box<dyn FeedAdapter>, &str) = match source {
            FeedSource::Pulse => (Box::new(PulseFeed), endpoints.pulse_url.as_str()),
            FeedSource::Malware => (Box::new(MalwareFeed), endpoints.malware_url.as_str()),
            FeedSource::AttackPattern => (Box::new(AttackPatternFeed), endpoints.attack_pattern_url.as_str()),
            FeedSource::Custom => {
                let url = feed.custom_url().ok_or_else(|| FeedError::FeedConfigError {
                    provider: provider.to_string(),
                    reason: "customUrl is required".to_string(),
                })?;
                (Box::new(CustomFeed), url)
            }
        };

        let url = Url::parse(raw_url).map_err(|e| FeedError::FeedConfigError {
            provider: provider.to_string(),
            reason: format!("invalid url `{}`: {}", raw_url, e),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FeedError::FeedConfigError {
                provider: provider.to_string(),
                reason: format!("unsupported url scheme `{}`", url.scheme()),
            });
        }

        let request = FeedRequest {
            url,
            api_key: feed.api_key().map(str::to_string),
            max_records: self.config.max_feed_records,
        };
        Ok((adapter, request))
    }

    /// 单个情报源
    pub async fn normalize(&self, feed: &FeedConfig) -> FeedNormalization {
        self.normalize_all(std::slice::from_ref(feed)).await
    }

    /// 并发拉取全部情报源，结果按配置顺序合并；任何失败都只产生诊断
    pub async fn normalize_all(&self, feeds: &[FeedConfig]) -> FeedNormalization {
        let mut slots: Vec<Option<Result<Vec<Rule>, FeedError>>> = Vec::with_capacity(feeds.len());
        slots.resize_with(feeds.len(), || None);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_feeds.max(1)));
        let mut tasks = JoinSet::new();

        for (index, feed) in feeds.iter().enumerate() {
            match self.resolve(feed) {
                Ok((adapter, request)) => {
                    debug!("[{}] fetching {}", adapter.name(), request.url);
                    tasks.spawn(run_feed(
                        index,
                        adapter,
                        self.client.clone(),
                        request,
                        Arc::clone(&semaphore),
                        self.config.feed_timeout,
                    ));
                }
                Err(e) => slots[index] = Some(Err(e)),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!("feed task aborted: {}", e),
            }
        }

        let mut result = FeedNormalization::default();
        for (slot, feed) in slots.into_iter().zip(feeds) {
            let outcome = slot.unwrap_or_else(|| {
                Err(FeedError::FeedFetchError {
                    provider: feed.source.clone(),
                    reason: "feed task did not complete".to_string(),
                })
            });
            match outcome {
                Ok(mut rules) => {
                    info!("[{}] normalized {} rules", feed.source, rules.len());
                    result.rules.append(&mut rules);
                }
                Err(e) => {
                    warn!("threat feed skipped: {}", e);
                    result.diagnostics.push(Diagnostic::from(&e));
                }
            }
        }
        result
    }
}

async fn run_feed(
    index: usize,
    adapter: Box<dyn FeedAdapter>,
    client: Client,
    request: FeedRequest,
    semaphore: Arc<Semaphore>,
    limit: Duration,
) -> (usize, Result<Vec<Rule>, FeedError>) {
    let provider = adapter.name().to_string();

    let outcome = async {
        let _permit = semaphore.acquire_owned().await.map_err(|e| FeedError::FeedFetchError {
            provider: provider.clone(),
            reason: e.to_string(),
        })?;

        let started = Instant::now();
        let payload = tokio::time::timeout(limit, adapter.fetch(&client, &request))
            .await
            .map_err(|_| FeedError::FeedTimeoutError {
                provider: provider.clone(),
                millis: limit.as_millis(),
            })??;
        debug!("[{}] fetched in {:?}", provider, started.elapsed());

        adapter.normalize(&payload, request.max_records)
    }
    .await;

    (index, outcome)
}
