//! 条件表达式词法分析

use super::ConditionError;

/// 条件表达式的词法单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    OpenParen,
    CloseParen,
    Not,
    And,
    Or,
    DoubleEquals,
    NotEquals,
    Boolean(bool),
    Identifier(String),
    String(String),
    Eof,
}

/// 带位置的词法单元（位置为字符偏移）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// 条件表达式词法分析器
#[derive(Debug)]
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// 切分全部词法单元，末尾追加 Eof
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ConditionError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.pos;
            let Some(ch) = self.current() else {
                tokens.push(Spanned { token: Token::Eof, position });
                return Ok(tokens);
            };

            let token = match ch {
                '(' => {
                    self.pos += 1;
                    Token::OpenParen
                }
                ')' => {
                    self.pos += 1;
                    Token::CloseParen
                }
                '=' if self.peek() == Some('=') => {
                    self.pos += 2;
                    Token::DoubleEquals
                }
                '!' if self.peek() == Some('=') => {
                    self.pos += 2;
                    Token::NotEquals
                }
                '!' => {
                    self.pos += 1;
                    Token::Not
                }
                '&' if self.peek() == Some('&') => {
                    self.pos += 2;
                    Token::And
                }
                '|' if self.peek() == Some('|') => {
                    self.pos += 2;
                    Token::Or
                }
                '\'' | '"' => self.read_string(ch)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.read_word(),
                other => {
                    return Err(ConditionError::new(position, format!("unexpected character `{}`", other)));
                }
            };
            tokens.push(Spanned { token, position });
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, ConditionError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        while let Some(ch) = self.current() {
            self.pos += 1;
            if ch == quote {
                return Ok(Token::String(value));
            }
            value.push(ch);
        }
        Err(ConditionError::new(start, "unterminated string literal"))
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                word.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }

        // 关键字忽略大小写（兼容 True/False 写法）
        match word.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            _ => Token::Identifier(word),
        }
    }
}
