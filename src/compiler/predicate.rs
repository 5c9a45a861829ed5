//! 编译后的条件谓词树
//! 求值只读取实体属性，不执行任何代码

use std::collections::BTreeSet;
use std::fmt;

use crate::model::AttributeSource;

/// 比较运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// 比较右值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Bool(bool),
}

/// 条件谓词
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// 常量（空条件编译为 `Const(true)`）
    Const(bool),
    /// 布尔属性引用
    Flag(String),
    /// 属性与字面量比较
    Compare {
        attribute: String,
        op: CompareOp,
        value: Literal,
    },
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// 恒真条件（情报源规则使用）
    pub fn always() -> Self {
        Predicate::Const(true)
    }

    /// 判断条件是否成立
    ///
    /// 只要引用了实体类型上不存在的属性，整个条件即不成立。
    pub fn matches<S: AttributeSource + ?Sized>(&self, source: &S) -> bool {
        self.evaluate(source).unwrap_or(false)
    }

    /// 三值求值：`None` 表示引用了不存在的属性
    pub fn evaluate<S: AttributeSource + ?Sized>(&self, source: &S) -> Option<bool> {
        match self {
            Predicate::Const(value) => Some(*value),
            Predicate::Flag(name) => source.flag(name),
            Predicate::Compare { attribute, op, value } => {
                let equal = match value {
                    Literal::Text(expected) => source.text(attribute)?.eq_ignore_ascii_case(expected),
                    Literal::Bool(expected) => source.flag(attribute)? == *expected,
                };
                Some(match op {
                    CompareOp::Eq => equal,
                    CompareOp::Ne => !equal,
                })
            }
            Predicate::Not(inner) => inner.evaluate(source).map(|v| !v),
            // 两侧都求值，保证缺失属性总能传播出来
            Predicate::And(left, right) => {
                let left = left.evaluate(source);
                let right = right.evaluate(source);
                Some(left? && right?)
            }
            Predicate::Or(left, right) => {
                let left = left.evaluate(source);
                let right = right.evaluate(source);
                Some(left? || right?)
            }
        }
    }

    /// 条件引用的全部属性名
    pub fn attributes(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Const(_) => {}
            Predicate::Flag(name) => {
                names.insert(name.as_str());
            }
            Predicate::Compare { attribute, .. } => {
                names.insert(attribute.as_str());
            }
            Predicate::Not(inner) => inner.collect_attributes(names),
            Predicate::And(left, right) | Predicate::Or(left, right) => {
                left.collect_attributes(names);
                right.collect_attributes(names);
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Const(value) => write!(f, "{}", value),
            Predicate::Flag(name) => f.write_str(name),
            Predicate::Compare { attribute, op, value } => {
                let op = match op {
                    CompareOp::Eq => "==",
                    CompareOp::Ne => "!=",
                };
                match value {
                    Literal::Text(text) => write!(f, "{} {} '{}'", attribute, op, text),
                    Literal::Bool(flag) => write!(f, "{} {} {}", attribute, op, flag),
                }
            }
            Predicate::Not(inner) => write!(f, "not {}", inner),
            Predicate::And(left, right) => write!(f, "({} and {})", left, right),
            Predicate::Or(left, right) => write!(f, "({} or {})", left, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementKind};

    fn flag(name: &str) -> Predicate {
        Predicate::Flag(name.to_string())
    }

    #[test]
    fn test_absent_attribute_is_false() {
        let app = Element::new("app", ElementKind::WebApp);
        // WebApp 没有 isPublic
        assert_eq!(flag("isPublic").evaluate(&app), None);
        assert!(!flag("isPublic").matches(&app));
        // 取反也不会让缺失属性变成 true
        assert!(!Predicate::Not(Box::new(flag("isPublic"))).matches(&app));
        // 与已知属性组合依旧不成立
        let either = Predicate::Or(Box::new(flag("isPublic")), Box::new(Predicate::Const(true)));
        assert!(!either.matches(&app));
    }

    #[test]
    fn test_compare_is_case_insensitive() {
        let bucket = Element::new("bucket", ElementKind::AwsS3);
        let is_s3 = Predicate::Compare {
            attribute: "type".to_string(),
            op: CompareOp::Eq,
            value: Literal::Text("awss3".to_string()),
        };
        assert!(is_s3.matches(&bucket));

        let not_encrypted = Predicate::Compare {
            attribute: "isEncrypted".to_string(),
            op: CompareOp::Ne,
            value: Literal::Bool(true),
        };
        assert!(not_encrypted.matches(&bucket));
        assert!(!not_encrypted.matches(&bucket.clone().encrypted(true)));
    }

    #[test]
    fn test_display_and_attributes() {
        let predicate = Predicate::And(
            Box::new(Predicate::Not(Box::new(flag("isEncrypted")))),
            Box::new(Predicate::Compare {
                attribute: "protocol".to_string(),
                op: CompareOp::Ne,
                value: Literal::Text("HTTPS".to_string()),
            }),
        );
        assert_eq!(predicate.to_string(), "(not isEncrypted and protocol != 'HTTPS')");
        assert_eq!(predicate.attributes().into_iter().collect::<Vec<_>>(), vec!["isEncrypted", "protocol"]);
    }
}
