//! 威胁情报源模块：拉取外部情报并归一化为统一规则结构
pub mod adapter;
pub mod pulse;
pub mod malware;
pub mod attack_pattern;
pub mod custom;
pub mod normalizer;
#[cfg(test)]
pub(crate) mod test_server;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

pub use self::adapter::{FeedAdapter, FeedRequest, RawFeedPayload};
pub use self::attack_pattern::AttackPatternFeed;
pub use self::custom::CustomFeed;
pub use self::malware::MalwareFeed;
pub use self::normalizer::{FeedNormalization, FeedNormalizer};
pub use self::pulse::PulseFeed;

/// 内置情报源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedSource {
    Pulse,
    Malware,
    AttackPattern,
    Custom,
}

impl FeedSource {
    pub const ALL: [FeedSource; 4] = [
        FeedSource::Pulse,
        FeedSource::Malware,
        FeedSource::AttackPattern,
        FeedSource::Custom,
    ];

    /// 配置中使用的情报源标识
    pub fn id(&self) -> &'static str {
        match self {
            FeedSource::Pulse => "pulse-feed",
            FeedSource::Malware => "malware-feed",
            FeedSource::AttackPattern => "attack-pattern-feed",
            FeedSource::Custom => "custom",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            FeedSource::Pulse => &["otx", "alienvault"],
            FeedSource::Malware => &["malwarebazaar"],
            FeedSource::AttackPattern => &["mitre", "capec"],
            FeedSource::Custom => &[],
        }
    }

    /// 按标识或别名查找（忽略大小写）
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|source| {
            source.id().eq_ignore_ascii_case(id)
                || source.aliases().iter().any(|alias| alias.eq_ignore_ascii_case(id))
        })
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FeedSource {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| FeedError::UnknownFeedSource(s.to_string()))
    }
}

/// 情报源配置（编辑器的 feedConfig）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    pub source: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub custom_url: Option<String>,
}

impl FeedConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_custom_url(mut self, url: impl Into<String>) -> Self {
        self.custom_url = Some(url.into());
        self
    }

    /// 非空的 API key
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }

    /// 非空的自定义 URL
    pub fn custom_url(&self) -> Option<&str> {
        self.custom_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_aliases() {
        assert_eq!(FeedSource::from_id("OTX"), Some(FeedSource::Pulse));
        assert_eq!(FeedSource::from_id("alienvault"), Some(FeedSource::Pulse));
        assert_eq!(FeedSource::from_id("malwarebazaar"), Some(FeedSource::Malware));
        assert_eq!(FeedSource::from_id("capec"), Some(FeedSource::AttackPattern));
        assert_eq!(FeedSource::from_id(" custom "), Some(FeedSource::Custom));
        assert!(matches!(
            "shodan".parse::<FeedSource>(),
            Err(FeedError::UnknownFeedSource(source)) if source == "shodan"
        ));
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let config: FeedConfig =
            serde_json::from_str(r#"{"source": "custom", "apiKey": "  ", "customUrl": null}"#).unwrap();
        assert_eq!(config.api_key(), None);
        assert_eq!(config.custom_url(), None);

        let config = FeedConfig::new("otx").with_api_key("k");
        assert_eq!(config.api_key(), Some("k"));
    }
}
