//! 静态规则加载
//! 规则源为有序记录数组（JSON 或 MessagePack），单条记录失败只跳过该条

use serde_json::Value;
use tracing::{debug, warn};

use super::model::{Rule, RuleRecord};
use crate::diagnostic::Diagnostic;
use crate::error::{RsThreatError, RstResult};
use crate::utils::{preview_compact, DIAGNOSTIC_PREVIEW_LEN};

/// 加载结果：成功编译的规则（保持源顺序）+ 被跳过记录的诊断
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            diagnostics: Vec::new(),
        }
    }
}

/// 规则加载器
pub struct RuleLoader;

impl RuleLoader {
    /// 从 JSON 文本加载；顶层不是数组时整体失败
    pub fn from_json_str(json: &str) -> RstResult<RuleSet> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Array(entries) => Ok(Self::from_values(entries)),
            other => Err(RsThreatError::RuleParseError(format!(
                "rule source must be an array, found: {}",
                preview_compact(&other.to_string(), DIAGNOSTIC_PREVIEW_LEN)
            ))),
        }
    }

    /// 从 MessagePack 字节加载
    pub fn from_msgpack(bytes: &[u8]) -> RstResult<RuleSet> {
        let entries: Vec<Value> = rmp_serde::from_slice(bytes)
            .map_err(|e| RsThreatError::MsgPackError(format!("反序列化失败：{}", e)))?;
        Ok(Self::from_values(entries))
    }

    /// 逐条解析原始记录
    pub fn from_values(entries: Vec<Value>) -> RuleSet {
        let mut records = Vec::with_capacity(entries.len());
        let mut diagnostics = Vec::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let preview = preview_compact(&entry.to_string(), DIAGNOSTIC_PREVIEW_LEN).to_string();
            match serde_json::from_value::<RuleRecord>(entry) {
                Ok(record) => records.push((index, record)),
                Err(e) => {
                    warn!("rule #{} skipped, malformed record: {} ({})", index, e, preview);
                    diagnostics.push(Diagnostic::rule_parse(
                        Self::subject(index),
                        format!("malformed record: {} ({})", e, preview),
                    ));
                }
            }
        }

        let mut set = Self::compile_indexed(records);
        // 记录级与编译级诊断按序号合并
        diagnostics.append(&mut set.diagnostics);
        diagnostics.sort_by_key(|d| Self::subject_index(&d.subject));
        set.diagnostics = diagnostics;
        Self::log_loaded(&set);
        set
    }

    /// 编译已反序列化的记录
    pub fn from_records(records: &[RuleRecord]) -> RuleSet {
        let set = Self::compile_indexed(records.iter().cloned().enumerate().collect());
        Self::log_loaded(&set);
        set
    }

    fn compile_indexed(records: Vec<(usize, RuleRecord)>) -> RuleSet {
        let mut set = RuleSet::default();
        for (index, record) in records {
            match record.compile() {
                Ok(rule) => set.rules.push(rule),
                Err(e) => {
                    warn!(
                        "rule #{} [{}] skipped: {} (condition: `{}`)",
                        index,
                        record.description,
                        e,
                        preview_compact(&record.condition, DIAGNOSTIC_PREVIEW_LEN)
                    );
                    set.diagnostics.push(Diagnostic::rule_parse(Self::subject(index), e.to_string()));
                }
            }
        }
        set
    }

    fn log_loaded(set: &RuleSet) {
        debug!(
            "static rules loaded: {} compiled, {} skipped",
            set.rules.len(),
            set.diagnostics.len()
        );
    }

    fn subject(index: usize) -> String {
        format!("rule #{}", index)
    }

    fn subject_index(subject: &str) -> usize {
        subject
            .strip_prefix("rule #")
            .and_then(|n| n.parse().ok())
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticKind;
    use crate::rule::model::{RuleTarget, SeverityValue};

    const MIXED_SOURCE: &str = r#"[
        {"target": "WebApp", "condition": "not target.sanitizesInput",
         "description": "Injection", "recommendation": "Validate input", "severity": "High", "stride": "Tampering"},
        {"target": "WebApp", "condition": "__import__('os').system('id')",
         "description": "Evil", "severity": "High"},
        {"target": "Dataflow", "description": "no severity"},
        {"target": "Dataflow", "condition": "protocol == 'FTP'",
         "description": "Cleartext file transfer", "severity": 6}
    ]"#;

    #[test]
    fn test_bad_rules_are_skipped_individually() {
        let set = RuleLoader::from_json_str(MIXED_SOURCE).unwrap();
        let descriptions: Vec<_> = set.rules.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Injection", "Cleartext file transfer"]);

        let subjects: Vec<_> = set.diagnostics.iter().map(|d| d.subject.as_str()).collect();
        assert_eq!(subjects, vec!["rule #1", "rule #2"]);
        assert!(set.diagnostics.iter().all(|d| d.kind == DiagnosticKind::RuleParse));
        assert_eq!(set.rules[0].stride, "Tampering");
        assert_eq!(set.rules[1].target, RuleTarget::Dataflow);
    }

    #[test]
    fn test_deeply_nested_condition_is_skipped() {
        let source = serde_json::json!([
            {"target": "WebApp", "condition": format!("{}isEncrypted", "not ".repeat(5_000)),
             "description": "Nested", "severity": "High"},
            {"target": "WebApp", "condition": format!("{}isEncrypted{}", "(".repeat(200), ")".repeat(200)),
             "description": "Parenthesized", "severity": "High"},
            {"target": "WebApp", "condition": "not isEncrypted", "description": "Plaintext", "severity": "Low"}
        ]);
        let set = RuleLoader::from_json_str(&source.to_string()).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.rules[0].description, "Plaintext");
        let subjects: Vec<_> = set.diagnostics.iter().map(|d| d.subject.as_str()).collect();
        assert_eq!(subjects, vec!["rule #0", "rule #1"]);
    }

    #[test]
    fn test_non_array_source_fails() {
        let err = RuleLoader::from_json_str(r#"{"rules": []}"#).unwrap_err();
        assert!(matches!(err, RsThreatError::RuleParseError(_)));
        assert!(matches!(RuleLoader::from_json_str("not json"), Err(RsThreatError::JsonError(_))));
    }

    #[test]
    fn test_msgpack_pack_loads() {
        let records = vec![RuleRecord {
            target: "AWSS3".to_string(),
            condition: "isPublic and not implementsAuthenticationScheme".to_string(),
            description: "Anonymous bucket access".to_string(),
            recommendation: "Block public access".to_string(),
            severity: SeverityValue::Label("High".to_string()),
            stride: Some("Information Disclosure".to_string()),
        }];
        let bytes = rmp_serde::to_vec_named(&records).unwrap();
        let set = RuleLoader::from_msgpack(&bytes).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.diagnostics.is_empty());
        assert_eq!(set.rules[0].target, RuleTarget::Element(crate::model::ElementKind::AwsS3));

        assert!(matches!(
            RuleLoader::from_msgpack(&[0xc1]),
            Err(RsThreatError::MsgPackError(_))
        ));
    }
}
