//! 检测结果定义

use std::fmt;

use serde::{Serialize, Serializer};

use crate::model::{EntityKind, EntityRef};
use crate::rule::{Rule, RuleOrigin, SeverityLabel};

/// 命中实体的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityType {
    Element,
    Dataflow,
}

impl From<EntityKind> for EntityType {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Element(_) => EntityType::Element,
            EntityKind::Dataflow => EntityType::Dataflow,
        }
    }
}

/// 结果来源
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FindingSource {
    /// 内置结构检查
    Structural,
    StaticRule,
    /// 情报源名称
    Feed(String),
}

impl From<&RuleOrigin> for FindingSource {
    fn from(origin: &RuleOrigin) -> Self {
        match origin {
            RuleOrigin::Static => FindingSource::StaticRule,
            RuleOrigin::Feed(provider) => FindingSource::Feed(provider.clone()),
        }
    }
}

impl fmt::Display for FindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingSource::Structural => f.write_str("structural"),
            FindingSource::StaticRule => f.write_str("static"),
            FindingSource::Feed(provider) => write!(f, "feed:{}", provider),
        }
    }
}

impl Serialize for FindingSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 一条威胁检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// 元素名，或数据流的 `源 -> 目标`
    pub entity: String,
    pub entity_type: EntityType,
    pub threat: String,
    pub recommendation: String,
    pub severity: SeverityLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub stride: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub best_practices: Vec<String>,
    pub source: FindingSource,
}

impl Finding {
    /// 规则命中实体
    pub fn from_rule(rule: &Rule, entity: &EntityRef<'_>) -> Self {
        Self {
            entity: entity.name().to_string(),
            entity_type: entity.kind().into(),
            threat: rule.description.clone(),
            recommendation: rule.recommendation.clone(),
            severity: rule.severity.label(),
            score: rule.severity.score(),
            stride: rule.stride.clone(),
            best_practices: Vec::new(),
            source: FindingSource::from(&rule.origin),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {} ({})", self.severity, self.entity, self.threat, self.stride)
    }
}
