//! 内置规则包缓存
//! 默认规则随 crate 嵌入，首次使用时解析一次，之后只读共享

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use super::loader::{RuleLoader, RuleSet};
use super::model::RuleRecord;
use crate::diagnostic::Diagnostic;
use crate::error::{RsThreatError, RstResult};

/// 嵌入的默认规则源
pub const DEFAULT_RULES_JSON: &str = include_str!("../../data/default_rules.json");

static DEFAULT_RULES: Lazy<Arc<RuleSet>> = Lazy::new(|| {
    let set = RuleLoader::from_json_str(DEFAULT_RULES_JSON).unwrap_or_else(|e| {
        warn!("内置规则包解析失败：{}", e);
        RuleSet {
            rules: Vec::new(),
            diagnostics: vec![Diagnostic::rule_parse("default rule pack", e.to_string())],
        }
    });
    debug!("内置规则包加载完成，规则数：{}", set.len());
    Arc::new(set)
});

/// 规则缓存管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 内置默认规则（进程内只解析一次）
    pub fn default_rules() -> Arc<RuleSet> {
        Arc::clone(&DEFAULT_RULES)
    }

    /// 将规则记录打包为 MessagePack（字段名保留，便于跨版本读取）
    pub fn to_msgpack(records: &[RuleRecord]) -> RstResult<Vec<u8>> {
        let bytes = rmp_serde::to_vec_named(records)
            .map_err(|e| RsThreatError::MsgPackError(format!("序列化失败：{}", e)))?;
        debug!("规则包序列化成功，记录数：{}，大小：{} 字节", records.len(), bytes.len());
        Ok(bytes)
    }

    /// 解析 JSON 规则源为原始记录（打包前使用），格式错误的记录直接报错
    pub fn records_from_json(json: &str) -> RstResult<Vec<RuleRecord>> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::model::RuleTarget;
    use crate::model::ElementKind;

    #[test]
    fn test_default_pack_parses_cleanly() {
        let set = RuleCacheManager::default_rules();
        assert_eq!(set.len(), 10);
        assert!(set.diagnostics.is_empty());
        // 默认规则不针对存储类资源，公网暴露由结构检查负责
        assert!(set.rules.iter().all(|r| r.target != RuleTarget::Element(ElementKind::AwsS3)));
        assert!(Arc::ptr_eq(&set, &RuleCacheManager::default_rules()));
    }

    #[test]
    fn test_pack_round_trip_preserves_order() {
        let records = RuleCacheManager::records_from_json(DEFAULT_RULES_JSON).unwrap();
        let bytes = RuleCacheManager::to_msgpack(&records).unwrap();
        let set = RuleLoader::from_msgpack(&bytes).unwrap();
        let from_json = RuleCacheManager::default_rules();
        assert_eq!(set.rules, from_json.rules);
    }
}
