//! 匹配引擎：结构检查 + 规则 × 实体交叉匹配
//! 输出只取决于模型与规则，顺序固定：结构检查 → 静态规则 → 情报源规则

use tracing::{debug, trace};

use super::finding::Finding;
use super::structural::run_structural_checks;
use crate::model::{EntityRef, ThreatModel};
use crate::rule::Rule;

/// 匹配引擎
#[derive(Debug, Clone, Copy)]
pub struct MatchingEngine<'a> {
    static_rules: &'a [Rule],
    feed_rules: &'a [Rule],
}

impl<'a> MatchingEngine<'a> {
    pub fn new(static_rules: &'a [Rule], feed_rules: &'a [Rule]) -> Self {
        Self {
            static_rules,
            feed_rules,
        }
    }

    /// 执行完整匹配
    pub fn run(&self, model: &ThreatModel) -> Vec<Finding> {
        let mut findings = run_structural_checks(model);
        let structural = findings.len();

        let entities: Vec<EntityRef<'_>> = model.entities().collect();
        findings.extend(match_rules(&entities, self.static_rules));
        findings.extend(match_rules(&entities, self.feed_rules));

        debug!(
            "model [{}]: {} structural findings, {} rule findings",
            model.name(),
            structural,
            findings.len() - structural
        );
        findings
    }
}

/// 规则优先遍历：每条规则依次检查全部实体
pub fn match_rules(entities: &[EntityRef<'_>], rules: &[Rule]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for rule in rules {
        for entity in entities {
            if rule.applies_to(entity) {
                findings.push(Finding::from_rule(rule, entity));
            } else if rule.target.matches(entity.kind()) && rule.references_absent_attribute(entity) {
                trace!(
                    "rule [{}] not applicable to [{}]: condition `{}` references an absent attribute",
                    rule.description,
                    entity.name(),
                    rule.condition_text
                );
            }
        }
    }
    findings
}
