//! 非致命诊断信息
//! 规则解析失败、情报源失败等不会中断分析，统一记录为诊断并随报告输出

use std::fmt;

use serde::Serialize;

use crate::error::FeedError;

/// 诊断类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    RuleParse,
    FeedFetch,
    FeedStatus,
    FeedParse,
    FeedTimeout,
    FeedUnknownSource,
    FeedConfig,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::RuleParse => "RuleParse",
            DiagnosticKind::FeedFetch => "FeedFetch",
            DiagnosticKind::FeedStatus => "FeedStatus",
            DiagnosticKind::FeedParse => "FeedParse",
            DiagnosticKind::FeedTimeout => "FeedTimeout",
            DiagnosticKind::FeedUnknownSource => "FeedUnknownSource",
            DiagnosticKind::FeedConfig => "FeedConfig",
        };
        f.write_str(name)
    }
}

/// 一条诊断：主体为规则序号/情报源名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub message: String,
}

impl Diagnostic {
    pub fn rule_parse(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::RuleParse,
            subject: subject.into(),
            http_status: None,
            message: message.into(),
        }
    }

    pub fn is_feed(&self) -> bool {
        !matches!(self.kind, DiagnosticKind::RuleParse)
    }
}

impl From<&FeedError> for Diagnostic {
    fn from(err: &FeedError) -> Self {
        let kind = match err {
            FeedError::FeedFetchError { .. } => DiagnosticKind::FeedFetch,
            FeedError::FeedStatusError { .. } => DiagnosticKind::FeedStatus,
            FeedError::FeedParseError { .. } => DiagnosticKind::FeedParse,
            FeedError::FeedTimeoutError { .. } => DiagnosticKind::FeedTimeout,
            FeedError::UnknownFeedSource(_) => DiagnosticKind::FeedUnknownSource,
            FeedError::FeedConfigError { .. } => DiagnosticKind::FeedConfig,
        };
        Self {
            kind,
            subject: err.provider().to_string(),
            http_status: err.http_status(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "[{}] {} (HTTP {}): {}", self.kind, self.subject, status, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.subject, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_feed_error() {
        let err = FeedError::FeedStatusError {
            provider: "malware-feed".to_string(),
            status: 500,
        };
        let diagnostic = Diagnostic::from(&err);
        assert_eq!(diagnostic.kind, DiagnosticKind::FeedStatus);
        assert_eq!(diagnostic.subject, "malware-feed");
        assert_eq!(diagnostic.http_status, Some(500));
        assert!(diagnostic.is_feed());

        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "FeedStatus");
        assert_eq!(json["httpStatus"], 500);
    }

    #[test]
    fn test_rule_parse_omits_status() {
        let diagnostic = Diagnostic::rule_parse("rule #3", "unexpected end of condition");
        assert!(!diagnostic.is_feed());
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert!(json.get("httpStatus").is_none());
        assert_eq!(diagnostic.to_string(), "[RuleParse] rule #3: unexpected end of condition");
    }
}
