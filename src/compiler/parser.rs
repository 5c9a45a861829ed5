//! 条件编译器：把规则中的文本条件解析为谓词树
//!
//! 语法（优先级从低到高）：
//! ```text
//! or      := and (("or" | "||") and)*
//! and     := unary (("and" | "&&") unary)*
//! unary   := ("not" | "!") unary | primary
//! primary := "(" or ")" | true | false | attr (("==" | "!=") (STRING | true | false))?
//! attr    := ["target."] IDENT
//! ```

use super::lexer::{Lexer, Spanned, Token};
use super::predicate::{CompareOp, Literal, Predicate};
use super::ConditionError;

/// 兼容旧规则的属性前缀
const TARGET_PREFIX: &str = "target.";

/// `not` 与括号的最大嵌套层数
pub const MAX_NESTING_DEPTH: usize = 64;

/// 单个条件允许的最大词法单元数（限制 and/or 链的长度）
pub const MAX_CONDITION_TOKENS: usize = 1024;

/// 条件编译器
pub struct ConditionCompiler;

impl ConditionCompiler {
    /// 编译条件文本；空白条件视为恒真
    pub fn compile(source: &str) -> Result<Predicate, ConditionError> {
        if source.trim().is_empty() {
            return Ok(Predicate::always());
        }
        let tokens = Lexer::new(source).tokenize()?;
        if tokens.len() > MAX_CONDITION_TOKENS {
            let position = tokens.get(MAX_CONDITION_TOKENS).map(|s| s.position).unwrap_or(0);
            return Err(ConditionError::new(position, "condition too long"));
        }
        let mut parser = Parser { tokens, pos: 0, depth: 0 };
        let predicate = parser.parse_or()?;
        match parser.current() {
            Token::Eof => Ok(predicate),
            other => Err(ConditionError::new(
                parser.position(),
                format!("unexpected token {:?} after expression", other),
            )),
        }
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.position)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), ConditionError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ConditionError::new(self.position(), "condition nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Predicate, ConditionError> {
        let mut left = self.parse_and()?;
        while *self.current() == Token::Or {
            self.advance();
            let right = self.parse_and()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Predicate, ConditionError> {
        let mut left = self.parse_unary()?;
        while *self.current() == Token::And {
            self.advance();
            let right = self.parse_unary()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Predicate, ConditionError> {
        if *self.current() == Token::Not {
            self.descend()?;
            self.advance();
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Predicate::Not(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate, ConditionError> {
        let position = self.position();
        match self.advance() {
            Token::OpenParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.advance() {
                    Token::CloseParen => Ok(inner),
                    _ => Err(ConditionError::new(self.position(), "expected `)`")),
                }
            }
            Token::Boolean(value) => Ok(Predicate::Const(value)),
            Token::Identifier(name) => {
                let attribute = Self::attribute_name(&name, position)?;
                self.parse_comparison(attribute)
            }
            Token::Eof => Err(ConditionError::new(position, "unexpected end of condition")),
            other => Err(ConditionError::new(position, format!("unexpected token {:?}", other))),
        }
    }

    fn parse_comparison(&mut self, attribute: String) -> Result<Predicate, ConditionError> {
        let op = match self.current() {
            Token::DoubleEquals => CompareOp::Eq,
            Token::NotEquals => CompareOp::Ne,
            _ => return Ok(Predicate::Flag(attribute)),
        };
        self.advance();

        let position = self.position();
        let value = match self.advance() {
            Token::String(text) => Literal::Text(text),
            Token::Boolean(flag) => Literal::Bool(flag),
            other => {
                return Err(ConditionError::new(
                    position,
                    format!("expected string or boolean literal, found {:?}", other),
                ));
            }
        };
        Ok(Predicate::Compare { attribute, op, value })
    }

    /// 去掉 `target.` 前缀；其余带点路径不支持
    fn attribute_name(raw: &str, position: usize) -> Result<String, ConditionError> {
        let name = raw.strip_prefix(TARGET_PREFIX).unwrap_or(raw);
        if name.is_empty() || name.contains('.') {
            return Err(ConditionError::new(
                position,
                format!("unsupported attribute path `{}`", raw),
            ));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementKind, ThreatModel};

    fn compile(source: &str) -> Predicate {
        ConditionCompiler::compile(source).unwrap()
    }

    #[test]
    fn test_precedence() {
        // and 绑定比 or 更紧
        assert_eq!(
            compile("a or b and c").to_string(),
            "(a or (b and c))"
        );
        assert_eq!(
            compile("(a or b) && !c").to_string(),
            "((a or b) and not c)"
        );
        assert_eq!(compile("not not a").to_string(), "not not a");
    }

    #[test]
    fn test_target_prefix_and_literals() {
        assert_eq!(compile("not target.isEncrypted"), compile("!isEncrypted"));
        assert_eq!(
            compile("target.protocol != \"HTTPS\"").to_string(),
            "protocol != 'HTTPS'"
        );
        assert_eq!(compile("isPublic == True").to_string(), "isPublic == true");
        assert_eq!(compile("   "), Predicate::always());
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "isEncrypted and",
            "(isPublic",
            "protocol == HTTPS",
            "isPublic isEncrypted",
            "target.",
            "element.config.isPublic",
            "os.system('ls')",
            "== 'x'",
        ] {
            assert!(ConditionCompiler::compile(bad).is_err(), "should reject `{bad}`");
        }
    }

    #[test]
    fn test_nesting_and_length_limits() {
        let deep_not = format!("{}isEncrypted", "not ".repeat(MAX_NESTING_DEPTH + 1));
        let err = ConditionCompiler::compile(&deep_not).unwrap_err();
        assert_eq!(err.message, "condition nested too deeply");

        let deep_paren = format!("{}isEncrypted{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(ConditionCompiler::compile(&deep_paren).unwrap_err().message, "condition nested too deeply");

        let huge = format!("{}isEncrypted", "not ".repeat(50_000));
        assert!(ConditionCompiler::compile(&huge).is_err());

        let long_chain = vec!["isEncrypted"; 2_000].join(" and ");
        assert_eq!(ConditionCompiler::compile(&long_chain).unwrap_err().message, "condition too long");

        // 上限以内照常编译
        let nested = format!("{}isEncrypted", "not ".repeat(MAX_NESTING_DEPTH));
        assert!(ConditionCompiler::compile(&nested).is_ok());
        let parens = format!("{}a{}", "(".repeat(MAX_NESTING_DEPTH), ")".repeat(MAX_NESTING_DEPTH));
        assert_eq!(compile(&parens), compile("a"));
    }

    #[test]
    fn test_evaluate_against_model_entities() {
        let mut model = ThreatModel::new("eval");
        model.add_element(Element::new("Web", ElementKind::WebApp)).unwrap();
        model.add_element(Element::new("Bucket", ElementKind::AwsS3).public(true)).unwrap();
        model.add_dataflow("Web", "Bucket", "upload", "http", false).unwrap();

        let entities: Vec<_> = model.entities().collect();
        let matching = |source: &str| -> Vec<String> {
            let predicate = compile(source);
            entities
                .iter()
                .filter(|e| predicate.matches(*e))
                .map(|e| e.name().to_string())
                .collect()
        };

        assert_eq!(matching("not isEncrypted"), vec!["Web", "Bucket", "Web -> Bucket"]);
        assert_eq!(matching("isPublic"), vec!["Bucket"]);
        // 数据流与 WebApp 都没有 isPublic
        assert_eq!(matching("not isPublic"), Vec::<String>::new());
        assert_eq!(matching("protocol == 'HTTP' and not isEncrypted"), vec!["Web -> Bucket"]);
        assert_eq!(matching("protocol != 'HTTPS'"), vec!["Web -> Bucket"]);
        assert_eq!(matching("true"), vec!["Web", "Bucket", "Web -> Bucket"]);
    }
}
