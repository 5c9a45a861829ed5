//! 规则数据模型定义
//! 静态规则与情报源规则共用同一结构，条件在加载时编译为谓词树

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::compiler::{ConditionCompiler, Predicate};
use crate::error::{RsThreatError, RstResult};
use crate::model::{AttributeSource, ElementKind, EntityKind, EntityRef};

/// 未指定 STRIDE 分类时的默认值
pub const DEFAULT_STRIDE: &str = "Unknown";

/// 严重等级（声明顺序即排序顺序：High 在前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityLabel {
    High,
    Medium,
    Low,
}

impl SeverityLabel {
    pub const ALL: [SeverityLabel; 3] = [SeverityLabel::High, SeverityLabel::Medium, SeverityLabel::Low];

    /// 分数映射：≤4 Low，5–6 Medium，≥7 High
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=4 => SeverityLabel::Low,
            5..=6 => SeverityLabel::Medium,
            _ => SeverityLabel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLabel::High => "High",
            SeverityLabel::Medium => "Medium",
            SeverityLabel::Low => "Low",
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLabel {
    type Err = RsThreatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(SeverityLabel::High),
            "medium" => Ok(SeverityLabel::Medium),
            "low" => Ok(SeverityLabel::Low),
            _ => Err(RsThreatError::RuleParseError(format!("invalid severity `{}`", s))),
        }
    }
}

/// 规则的严重程度：等级或整数分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSeverity {
    Label(SeverityLabel),
    Score(u32),
}

impl RuleSeverity {
    pub fn label(&self) -> SeverityLabel {
        match self {
            RuleSeverity::Label(label) => *label,
            RuleSeverity::Score(score) => SeverityLabel::from_score(*score),
        }
    }

    pub fn score(&self) -> Option<u32> {
        match self {
            RuleSeverity::Label(_) => None,
            RuleSeverity::Score(score) => Some(*score),
        }
    }
}

/// 规则作用对象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    /// `*` / `Any`：全部实体
    Any,
    /// `Element`：全部元素
    AnyElement,
    Dataflow,
    Element(ElementKind),
}

impl RuleTarget {
    pub fn matches(&self, kind: EntityKind) -> bool {
        match (self, kind) {
            (RuleTarget::Any, _) => true,
            (RuleTarget::AnyElement, EntityKind::Element(_)) => true,
            (RuleTarget::Dataflow, EntityKind::Dataflow) => true,
            (RuleTarget::Element(expected), EntityKind::Element(actual)) => *expected == actual,
            _ => false,
        }
    }
}

impl FromStr for RuleTarget {
    type Err = RsThreatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name == "*" || name.eq_ignore_ascii_case("any") {
            return Ok(RuleTarget::Any);
        }
        if name.eq_ignore_ascii_case("element") {
            return Ok(RuleTarget::AnyElement);
        }
        if name.eq_ignore_ascii_case("dataflow") {
            return Ok(RuleTarget::Dataflow);
        }
        ElementKind::from_name(name)
            .map(RuleTarget::Element)
            .ok_or_else(|| RsThreatError::RuleParseError(format!("unknown rule target `{}`", s)))
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTarget::Any => f.write_str("*"),
            RuleTarget::AnyElement => f.write_str("Element"),
            RuleTarget::Dataflow => f.write_str("Dataflow"),
            RuleTarget::Element(kind) => f.write_str(kind.as_str()),
        }
    }
}

impl Serialize for RuleTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 规则来源
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleOrigin {
    Static,
    /// 情报源名称
    Feed(String),
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOrigin::Static => f.write_str("static"),
            RuleOrigin::Feed(provider) => write!(f, "feed:{}", provider),
        }
    }
}

/// 已编译的规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub target: RuleTarget,
    pub condition: Predicate,
    /// 原始条件文本（用于日志与诊断）
    pub condition_text: String,
    pub description: String,
    pub recommendation: String,
    pub severity: RuleSeverity,
    pub stride: String,
    pub origin: RuleOrigin,
}

impl Rule {
    /// 情报源规则：条件恒真
    pub fn from_feed(
        provider: impl Into<String>,
        target: RuleTarget,
        description: impl Into<String>,
        recommendation: impl Into<String>,
        severity: SeverityLabel,
    ) -> Self {
        Self {
            target,
            condition: Predicate::always(),
            condition_text: String::new(),
            description: description.into(),
            recommendation: recommendation.into(),
            severity: RuleSeverity::Label(severity),
            stride: DEFAULT_STRIDE.to_string(),
            origin: RuleOrigin::Feed(provider.into()),
        }
    }

    pub fn with_stride(mut self, stride: impl Into<String>) -> Self {
        self.stride = stride.into();
        self
    }

    /// 目标类型匹配且条件成立
    pub fn applies_to(&self, entity: &EntityRef<'_>) -> bool {
        self.target.matches(entity.kind()) && self.condition.matches(entity)
    }

    /// 条件是否引用了该实体上不存在的属性
    pub fn references_absent_attribute(&self, entity: &EntityRef<'_>) -> bool {
        self.condition
            .attributes()
            .into_iter()
            .any(|name| entity.flag(name).is_none() && entity.text(name).is_none())
    }
}

/// 规则源中严重程度的原始写法
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SeverityValue {
    Score(u32),
    Label(String),
}

/// 规则源中的原始记录
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleRecord {
    pub target: String,
    #[serde(default)]
    pub condition: String,
    pub description: String,
    #[serde(default)]
    pub recommendation: String,
    pub severity: SeverityValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<String>,
}

impl RuleRecord {
    /// 编译为静态规则：目标、严重程度、条件任一非法即失败
    pub fn compile(&self) -> RstResult<Rule> {
        let target: RuleTarget = self.target.parse()?;
        let severity = match &self.severity {
            SeverityValue::Score(score) => RuleSeverity::Score(*score),
            SeverityValue::Label(label) => RuleSeverity::Label(label.parse()?),
        };
        let condition = ConditionCompiler::compile(&self.condition)?;
        let stride = self
            .stride
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STRIDE);

        Ok(Rule {
            target,
            condition,
            condition_text: self.condition.clone(),
            description: self.description.clone(),
            recommendation: self.recommendation.clone(),
            severity,
            stride: stride.to_string(),
            origin: RuleOrigin::Static,
        })
    }
}
