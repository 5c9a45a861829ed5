//! 结构检查的加性评分
//!
//! 基础分 3；未加密数据流 +2，非 HTTPS 再 +1；公网暴露 +2，同时未加密再 +2；
//! 未加密元素 +2。分数经 [`SeverityLabel::from_score`] 映射为等级。

use crate::model::{Dataflow, Element};
use crate::rule::SeverityLabel;

pub const BASE_SCORE: u32 = 3;
pub const UNENCRYPTED_PENALTY: u32 = 2;
pub const NON_HTTPS_PENALTY: u32 = 1;
pub const PUBLIC_PENALTY: u32 = 2;

/// 分数与等级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub value: u32,
    pub label: SeverityLabel,
}

impl Score {
    pub fn new(value: u32) -> Self {
        Self {
            value,
            label: SeverityLabel::from_score(value),
        }
    }
}

/// 评分器
pub struct SeverityScorer;

impl SeverityScorer {
    /// 未加密数据流；已加密返回 None
    pub fn dataflow(flow: &Dataflow) -> Option<Score> {
        if flow.is_encrypted {
            return None;
        }
        let mut value = BASE_SCORE + UNENCRYPTED_PENALTY;
        if !flow.is_https() {
            value += NON_HTTPS_PENALTY;
        }
        Some(Score::new(value))
    }

    /// 公网暴露元素；未暴露返回 None
    pub fn exposure(element: &Element) -> Option<Score> {
        if !element.is_exposed() {
            return None;
        }
        let mut value = BASE_SCORE + PUBLIC_PENALTY;
        // 未加密在此计一次，在未加密元素检查中还会再计一次
        if !element.attributes.is_encrypted {
            value += UNENCRYPTED_PENALTY;
        }
        Some(Score::new(value))
    }

    /// 未加密元素；已加密返回 None
    pub fn unencrypted_element(element: &Element) -> Option<Score> {
        (!element.attributes.is_encrypted).then(|| Score::new(BASE_SCORE + UNENCRYPTED_PENALTY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, ThreatModel};

    fn flow(protocol: &str, encrypted: bool) -> Dataflow {
        let mut model = ThreatModel::new("flows");
        model.add_element(Element::new("a", ElementKind::WebApp)).unwrap();
        model.add_element(Element::new("b", ElementKind::Api)).unwrap();
        model.add_dataflow("a", "b", protocol, protocol, encrypted).unwrap();
        model.dataflows()[0].clone()
    }

    #[test]
    fn test_dataflow_scores() {
        assert_eq!(SeverityScorer::dataflow(&flow("HTTPS", false)), Some(Score::new(5)));
        assert_eq!(SeverityScorer::dataflow(&flow("https", false)).map(|s| s.label), Some(SeverityLabel::Medium));
        assert_eq!(SeverityScorer::dataflow(&flow("HTTP", false)), Some(Score::new(6)));
        assert_eq!(SeverityScorer::dataflow(&flow("HTTP", false)).map(|s| s.label), Some(SeverityLabel::Medium));
        assert_eq!(SeverityScorer::dataflow(&flow("HTTP", true)), None);
    }

    #[test]
    fn test_element_scores() {
        let open_bucket = Element::new("DB", ElementKind::AwsS3).public(true);
        let exposure = SeverityScorer::exposure(&open_bucket).unwrap();
        assert_eq!((exposure.value, exposure.label), (7, SeverityLabel::High));
        let unencrypted = SeverityScorer::unencrypted_element(&open_bucket).unwrap();
        assert_eq!((unencrypted.value, unencrypted.label), (5, SeverityLabel::Medium));

        let sealed_bucket = open_bucket.clone().encrypted(true);
        assert_eq!(SeverityScorer::exposure(&sealed_bucket), Some(Score::new(5)));
        assert_eq!(SeverityScorer::unencrypted_element(&sealed_bucket), None);

        // 不声明 isPublic 的类型不会产生暴露评分
        let app = Element::new("app", ElementKind::WebApp).public(true);
        assert_eq!(SeverityScorer::exposure(&app), None);
    }
}
