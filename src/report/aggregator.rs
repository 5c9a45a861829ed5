//! 结果聚合：严重等级统计、稳定排序、渲染视图

use std::fmt;

use serde::Serialize;

use crate::detector::Finding;
use crate::diagnostic::Diagnostic;
use crate::error::RstResult;
use crate::model::{ElementAttributes, ElementKind, Provider, ThreatModel};
use crate::rule::SeverityLabel;

/// 按严重等级计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeveritySummary {
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Low")]
    pub low: usize,
}

impl SeveritySummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            match finding.severity {
                SeverityLabel::High => summary.high += 1,
                SeverityLabel::Medium => summary.medium += 1,
                SeverityLabel::Low => summary.low += 1,
            }
        }
        summary
    }

    pub fn count(&self, label: SeverityLabel) -> usize {
        match label {
            SeverityLabel::High => self.high,
            SeverityLabel::Medium => self.medium,
            SeverityLabel::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// 元素视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementView {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub display_label: &'static str,
    pub provider: Provider,
    #[serde(flatten)]
    pub attributes: ElementAttributes,
}

/// 数据流视图（端点已解析为元素名）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataflowView {
    pub source: String,
    pub target: String,
    pub label: String,
    pub protocol: String,
    pub is_encrypted: bool,
}

/// 分析报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub model_name: String,
    /// High 在前；同等级保持产生顺序
    pub findings: Vec<Finding>,
    pub summary: SeveritySummary,
    pub elements: Vec<ElementView>,
    pub dataflows: Vec<DataflowView>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub fn to_json_pretty(&self) -> RstResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_compact(&self) -> RstResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 指定等级的结果
    pub fn findings_with(&self, label: SeverityLabel) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == label)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Threat report: {}", self.model_name)?;
        writeln!(
            f,
            "{} elements, {} dataflows, {} findings (High {}, Medium {}, Low {})",
            self.elements.len(),
            self.dataflows.len(),
            self.summary.total(),
            self.summary.high,
            self.summary.medium,
            self.summary.low
        )?;
        for finding in &self.findings {
            writeln!(f, "  {}", finding)?;
            writeln!(f, "      -> {}", finding.recommendation)?;
            for practice in &finding.best_practices {
                writeln!(f, "         * {}", practice)?;
            }
        }
        if !self.diagnostics.is_empty() {
            writeln!(f, "Diagnostics:")?;
            for diagnostic in &self.diagnostics {
                writeln!(f, "  {}", diagnostic)?;
            }
        }
        Ok(())
    }
}

/// 结果聚合器
pub struct ReportAggregator;

impl ReportAggregator {
    /// 统计、排序并生成报告
    pub fn aggregate(model: &ThreatModel, mut findings: Vec<Finding>, diagnostics: Vec<Diagnostic>) -> AnalysisReport {
        let summary = SeveritySummary::from_findings(&findings);
        // sort_by_key 是稳定排序
        findings.sort_by_key(|finding| finding.severity);

        let elements = model
            .elements()
            .iter()
            .map(|element| ElementView {
                name: element.name.clone(),
                kind: element.kind,
                display_label: element.kind.label(),
                provider: element.kind.provider(),
                attributes: element.attributes.clone(),
            })
            .collect();

        let resolve = |id| {
            model
                .element(id)
                .map(|element| element.name.clone())
                .unwrap_or_default()
        };
        let dataflows = model
            .dataflows()
            .iter()
            .map(|flow| DataflowView {
                source: resolve(flow.source()),
                target: resolve(flow.target()),
                label: flow.label.clone(),
                protocol: flow.protocol.clone(),
                is_encrypted: flow.is_encrypted,
            })
            .collect();

        AnalysisReport {
            model_name: model.name().to_string(),
            findings,
            summary,
            elements,
            dataflows,
            diagnostics,
        }
    }
}
