//! Part 21 词法分析

use super::StepError;

/// 词法单元
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// 关键字，如 `CARTESIAN_POINT`、`ISO-10303-21`
    Keyword(String),
    /// 实例引用 `#123`
    EntityRef(u64),
    /// 字符串字面量，保留原始字节以便按代码页解码
    String(Vec<u8>),
    Real(f64),
    Integer(i64),
    /// 枚举 `.T.`
    Enum(String),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Equals,
    Asterisk,
    Dollar,
}

/// 带行号的词法单元
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, StepError> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<SpannedToken>, StepError> {
        self.skip_whitespace_and_comments();

        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let line = self.line;

        let token = match ch {
            b'(' | b')' | b',' | b';' | b'=' | b'*' | b'$' => {
                self.advance();
                match ch {
                    b'(' => Token::LParen,
                    b')' => Token::RParen,
                    b',' => Token::Comma,
                    b';' => Token::Semicolon,
                    b'=' => Token::Equals,
                    b'*' => Token::Asterisk,
                    _ => Token::Dollar,
                }
            }
            b'#' => self.read_entity_ref()?,
            b'\'' => self.read_string()?,
            b'.' => self.read_enum()?,
            b'-' | b'+' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()?
            }
            b'0'..=b'9' => self.read_number()?,
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.read_keyword(),
            _ => {
                return Err(StepError::lexer(
                    self.line,
                    format!("unexpected character: '{}'", ch as char),
                ))
            }
        };

        Ok(Some(SpannedToken { token, line }))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.advance();
            }

            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                self.advance();
                self.advance();
                while self.peek().is_some() {
                    if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            break;
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.advance();
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn read_entity_ref(&mut self) -> Result<Token, StepError> {
        let line = self.line;
        self.advance();
        let digits = self.take_while(|c| c.is_ascii_digit());
        digits
            .parse()
            .map(Token::EntityRef)
            .map_err(|_| StepError::lexer(line, format!("invalid entity reference: #{digits}")))
    }

    fn read_string(&mut self) -> Result<Token, StepError> {
        let line = self.line;
        self.advance();

        let mut content = Vec::new();
        loop {
            match self.advance() {
                None => return Err(StepError::lexer(line, "unterminated string")),
                Some(b'\'') => {
                    if self.peek() == Some(b'\'') {
                        content.push(b'\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                // 字符串内换行不属于内容
                Some(b'\n') | Some(b'\r') => {}
                Some(ch) => content.push(ch),
            }
        }

        Ok(Token::String(content))
    }

    fn read_enum(&mut self) -> Result<Token, StepError> {
        let line = self.line;
        self.advance();
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        if name.is_empty() || self.advance() != Some(b'.') {
            return Err(StepError::lexer(line, "malformed enumeration"));
        }
        Ok(Token::Enum(name))
    }

    fn read_number(&mut self) -> Result<Token, StepError> {
        let line = self.line;
        let mut text = String::new();
        let mut is_real = false;

        if let Some(sign @ (b'-' | b'+')) = self.peek() {
            text.push(sign as char);
            self.advance();
        }
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));

        if self.peek() == Some(b'.') {
            is_real = true;
            self.advance();
            text.push('.');
            let fraction = self.take_while(|c| c.is_ascii_digit());
            if fraction.is_empty() {
                text.push('0');
            }
            text.push_str(&fraction);
        }

        if let Some(e @ (b'E' | b'e')) = self.peek() {
            is_real = true;
            text.push(e as char);
            self.advance();
            if let Some(sign @ (b'-' | b'+')) = self.peek() {
                text.push(sign as char);
                self.advance();
            }
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }

        if is_real {
            text.parse()
                .map(Token::Real)
                .map_err(|_| StepError::lexer(line, format!("invalid real number: {text}")))
        } else {
            text.parse()
                .map(Token::Integer)
                .map_err(|_| StepError::lexer(line, format!("invalid integer: {text}")))
        }
    }

    fn read_keyword(&mut self) -> Token {
        Token::Keyword(self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-'))
    }
}
