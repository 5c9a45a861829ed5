//! 报告模块：汇总检测结果，供渲染层使用
pub mod aggregator;

pub use self::aggregator::{AnalysisReport, DataflowView, ElementView, ReportAggregator, SeveritySummary};
