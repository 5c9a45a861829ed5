//! 检测模块：结构检查、规则匹配与分析流程
pub mod severity;
pub mod structural;
pub mod finding;
pub mod matcher;
pub mod detector;

// 导出核心接口
pub use self::detector::ThreatDetector;
pub use self::finding::{EntityType, Finding, FindingSource};
pub use self::matcher::{match_rules, MatchingEngine};
pub use self::severity::{Score, SeverityScorer};
pub use self::structural::{
    run_structural_checks, StructuralCheck, PUBLICLY_EXPOSED_ELEMENT, UNENCRYPTED_DATAFLOW, UNENCRYPTED_ELEMENT,
};
