//! rsthreat - Rust 威胁建模分析引擎
//!
//! 输入由元素与数据流组成的系统模型，结合内置结构检查、静态规则
//! 以及外部威胁情报源归一化得到的规则，输出带严重等级与修复建议的检测结果。

// 导出全局错误类型
pub use self::error::{FeedError, RsThreatError, RstResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, EngineConfig, FeedEndpoints};

// 导出模型模块核心接口
pub use self::model::{
    AttributeSource, Dataflow, Element, ElementAttributes, ElementId, ElementKind, EntityKind, EntityRef,
    ModelInput, Provider, ThreatModel,
};

// 导出规则模块核心接口
pub use self::rule::{
    Rule, RuleCacheManager, RuleLoader, RuleOrigin, RuleRecord, RuleSet, RuleSeverity, RuleTarget, SeverityLabel,
};

// 导出编译模块核心接口
pub use self::compiler::{compile_condition, ConditionCompiler, ConditionError, Predicate};

// 导出情报源模块核心接口
pub use self::feed::{FeedAdapter, FeedConfig, FeedNormalization, FeedNormalizer, FeedSource};

// 导出检测模块核心接口
pub use self::detector::{Finding, FindingSource, MatchingEngine, StructuralCheck, ThreatDetector};

// 导出报告与诊断
pub use self::diagnostic::{Diagnostic, DiagnosticKind};
pub use self::report::{AnalysisReport, ReportAggregator, SeveritySummary};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod model;
pub mod rule;
pub mod compiler;
pub mod feed;
pub mod detector;
pub mod report;
pub mod diagnostic;
pub mod utils;

/// 测试日志初始化（RUST_LOG 控制级别，可重复调用）
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
