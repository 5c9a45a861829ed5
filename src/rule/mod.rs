//! 规则模块：规则数据模型、静态规则加载、内置规则包缓存
pub mod model;
pub mod loader;
pub mod cache;

// 导出核心接口
pub use self::model::{
    Rule, RuleOrigin, RuleRecord, RuleSeverity, RuleTarget, SeverityLabel, SeverityValue, DEFAULT_STRIDE,
};
pub use self::loader::{RuleLoader, RuleSet};
pub use self::cache::RuleCacheManager;
