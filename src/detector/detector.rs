//! 检测器核心：规则加载 → 情报源归一化 → 匹配 → 聚合
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::matcher::MatchingEngine;
use crate::config::EngineConfig;
use crate::diagnostic::Diagnostic;
use crate::error::{RsThreatError, RstResult};
use crate::feed::{FeedConfig, FeedNormalization, FeedNormalizer};
use crate::model::{ModelInput, ThreatModel};
use crate::report::{AnalysisReport, ReportAggregator};
use crate::rule::{RuleCacheManager, RuleSet};

/// 威胁检测器
#[derive(Debug, Clone)]
pub struct ThreatDetector {
    rules: Arc<RuleSet>,
    normalizer: FeedNormalizer,
}

impl ThreatDetector {
    /// 使用内置默认规则创建检测器
    pub fn new(config: EngineConfig) -> RstResult<Self> {
        Self::with_rules(config, RuleCacheManager::default_rules())
    }

    /// 使用调用方提供的静态规则
    pub fn with_rules(config: EngineConfig, rules: Arc<RuleSet>) -> RstResult<Self> {
        debug!(
            "threat detector created: {} static rules, {} rule diagnostics",
            rules.len(),
            rules.diagnostics.len()
        );
        Ok(Self {
            rules,
            normalizer: FeedNormalizer::new(config)?,
        })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        self.normalizer.config()
    }

    /// 离线分析：只使用结构检查与静态规则
    pub fn analyze_model(&self, model: &ThreatModel) -> AnalysisReport {
        self.finish(model, FeedNormalization::default())
    }

    /// 完整分析：先拉取并归一化情报源，全部结束后再匹配
    pub async fn analyze(&self, model: &ThreatModel, feeds: &[FeedConfig]) -> AnalysisReport {
        let normalization = self.normalizer.normalize_all(feeds).await;
        self.finish(model, normalization)
    }

    /// 从编辑器输入构建模型并分析；模型构建失败是唯一的顶层错误
    pub async fn analyze_input(&self, input: &ModelInput) -> RstResult<AnalysisReport> {
        let model = input.build()?;
        let feeds: Vec<FeedConfig> = input.feed_config.iter().cloned().collect();
        Ok(self.analyze(&model, &feeds).await)
    }

    /// 可取消的分析：`cancel` 先完成时放弃未完成的拉取，不产生任何结果
    pub async fn analyze_until<F>(&self, model: &ThreatModel, feeds: &[FeedConfig], cancel: F) -> RstResult<AnalysisReport>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                warn!("analysis of model [{}] cancelled", model.name());
                Err(RsThreatError::AnalysisCancelled)
            }
            report = self.analyze(model, feeds) => Ok(report),
        }
    }

    fn finish(&self, model: &ThreatModel, normalization: FeedNormalization) -> AnalysisReport {
        let FeedNormalization {
            rules: feed_rules,
            diagnostics: feed_diagnostics,
        } = normalization;

        let findings = MatchingEngine::new(&self.rules.rules, &feed_rules).run(model);

        let diagnostics: Vec<Diagnostic> = self
            .rules
            .diagnostics
            .iter()
            .cloned()
            .chain(feed_diagnostics)
            .collect();

        let report = ReportAggregator::aggregate(model, findings, diagnostics);
        info!(
            "model [{}] analyzed: High {}, Medium {}, Low {}, {} diagnostics",
            report.model_name,
            report.summary.high,
            report.summary.medium,
            report.summary.low,
            report.diagnostics.len()
        );
        report
    }
}
