//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;

use crate::compiler::ConditionError;

#[derive(Error, Debug)]
pub enum RsThreatError {
    // 模型构建错误（对单次构建调用是致命的）
    #[error("元素名称重复：{0}")]
    DuplicateNameError(String),
    #[error("数据流端点不存在：{endpoint}（数据流 {source_name} -> {target_name}）")]
    UnknownEndpointError {
        endpoint: String,
        source_name: String,
        target_name: String,
    },
    #[error("未知的元素类型：{0}")]
    UnknownElementKindError(String),

    // 规则相关错误
    #[error("规则解析失败：{0}")]
    RuleParseError(String),
    #[error("条件解析失败：{0}")]
    ConditionError(#[from] ConditionError),

    // 威胁情报源错误
    #[error(transparent)]
    FeedError(#[from] FeedError),

    // HTTP 客户端构建错误
    #[error("HTTP客户端初始化失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("MessagePack编解码失败：{0}")]
    MsgPackError(String),

    // 基础错误
    #[error("无效输入：{0}")]
    InvalidInput(String),
    #[error("分析已取消")]
    AnalysisCancelled,
}

/// 单个威胁情报源的错误，只影响该情报源
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("[{provider}] 请求失败：{reason}")]
    FeedFetchError { provider: String, reason: String },
    #[error("[{provider}] 返回状态码 {status}")]
    FeedStatusError { provider: String, status: u16 },
    #[error("[{provider}] 响应解析失败：{reason}")]
    FeedParseError { provider: String, reason: String },
    #[error("[{provider}] 超时（{millis} ms）")]
    FeedTimeoutError { provider: String, millis: u128 },
    #[error("未知的情报源：{0}")]
    UnknownFeedSource(String),
    #[error("[{provider}] 配置无效：{reason}")]
    FeedConfigError { provider: String, reason: String },
}

impl FeedError {
    /// 出错的情报源名称
    pub fn provider(&self) -> &str {
        match self {
            FeedError::FeedFetchError { provider, .. }
            | FeedError::FeedStatusError { provider, .. }
            | FeedError::FeedParseError { provider, .. }
            | FeedError::FeedTimeoutError { provider, .. }
            | FeedError::FeedConfigError { provider, .. } => provider,
            FeedError::UnknownFeedSource(source) => source,
        }
    }

    /// HTTP 状态码（仅状态码错误携带）
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FeedError::FeedStatusError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// 全局Result类型
pub type RstResult<T> = Result<T, RsThreatError>;
