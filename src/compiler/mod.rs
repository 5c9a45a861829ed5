//! 编译模块：将规则中的文本条件编译为可安全求值的谓词树
pub mod lexer;
pub mod parser;
pub mod predicate;

use thiserror::Error;

pub use self::parser::ConditionCompiler;
pub use self::predicate::{CompareOp, Literal, Predicate};

/// 条件文本的词法/语法错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("第 {position} 个字符处：{message}")]
pub struct ConditionError {
    /// 出错位置（字符偏移）
    pub position: usize,
    pub message: String,
}

impl ConditionError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// 编译条件文本（`ConditionCompiler::compile` 的简写）
pub fn compile_condition(source: &str) -> Result<Predicate, ConditionError> {
    ConditionCompiler::compile(source)
}
