//! 引擎配置管理，存储所有可配置项
//! 配置在构建检测器时显式传入，不存在全局可变配置

use std::time::Duration;

/// 默认单源超时
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(5);
/// 默认每个情报源最多保留的记录数
pub const DEFAULT_MAX_FEED_RECORDS: usize = 5;
/// 默认并发拉取的情报源数量上限
pub const DEFAULT_MAX_CONCURRENT_FEEDS: usize = 4;

/// 各情报源的默认地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    /// OTX 订阅脉冲接口
    pub pulse_url: String,
    /// MalwareBazaar 查询接口
    pub malware_url: String,
    /// STIX 攻击模式知识库
    pub attack_pattern_url: String,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            pulse_url: "https://otx.alienvault.com/api/v1/pulses/subscribed?limit=5".to_string(),
            malware_url: "https://mb-api.abuse.ch/api/v1/".to_string(),
            attack_pattern_url: "https://raw.githubusercontent.com/mitre/cti/master/capec/2.1/stix-capec.json".to_string(),
        }
    }
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // 单个情报源的超时
    pub feed_timeout: Duration,
    // 每个情报源每次分析最多转换的记录数
    pub max_feed_records: usize,
    // 并发拉取上限
    pub max_concurrent_feeds: usize,
    // HTTP User-Agent
    pub user_agent: String,
    // 情报源地址
    pub endpoints: FeedEndpoints,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_timeout: DEFAULT_FEED_TIMEOUT,
            max_feed_records: DEFAULT_MAX_FEED_RECORDS,
            max_concurrent_feeds: DEFAULT_MAX_CONCURRENT_FEEDS,
            user_agent: format!("Rsthreat/{}", env!("CARGO_PKG_VERSION")),
            endpoints: FeedEndpoints::default(),
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> EngineConfig {
        EngineConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: EngineConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn feed_timeout(mut self, timeout: Duration) -> Self {
        self.config.feed_timeout = timeout;
        self
    }

    pub fn max_feed_records(mut self, limit: usize) -> Self {
        self.config.max_feed_records = limit;
        self
    }

    /// 并发上限至少为 1
    pub fn max_concurrent_feeds(mut self, limit: usize) -> Self {
        self.config.max_concurrent_feeds = limit.max(1);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn pulse_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoints.pulse_url = url.into();
        self
    }

    pub fn malware_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoints.malware_url = url.into();
        self
    }

    pub fn attack_pattern_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoints.attack_pattern_url = url.into();
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
