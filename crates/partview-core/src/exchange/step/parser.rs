//! Part 21 语法分析：构建未解释的实例图

use super::lexer::{Lexer, SpannedToken, Token};
use super::StepError;
use std::collections::BTreeMap;

/// 参数值
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    EntityRef(u64),
    String(Vec<u8>),
    Real(f64),
    Integer(i64),
    Enum(String),
    List(Vec<StepValue>),
    /// 派生值 `*`
    Derived,
    /// 未设置 `$`
    Null,
    /// 带类型的值 `TYPE(args)`
    Typed { type_name: String, args: Vec<StepValue> },
}

impl StepValue {
    pub fn as_entity_ref(&self) -> Option<u64> {
        match self {
            StepValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// 实数，整数会被提升
    pub fn as_real(&self) -> Option<f64> {
        match self {
            StepValue::Real(v) => Some(*v),
            StepValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            StepValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(v) => Some(v),
            _ => None,
        }
    }
}

/// 实例；复杂实例的类型名为空，参数为各部分的 `Typed` 值
#[derive(Debug, Clone, PartialEq)]
pub struct StepEntity {
    pub id: u64,
    pub type_name: String,
    pub args: Vec<StepValue>,
}

impl StepEntity {
    pub fn arg(&self, index: usize) -> Option<&StepValue> {
        self.args.get(index)
    }
}

/// 解析后的文件
#[derive(Debug, Clone, Default)]
pub struct StepModel {
    /// 头段实例（id 为 0）
    pub header: Vec<StepEntity>,
    /// 数据段实例，按 id 有序
    pub entities: BTreeMap<u64, StepEntity>,
}

impl StepModel {
    pub fn parse(input: &[u8]) -> Result<Self, StepError> {
        let tokens = Lexer::new(input).tokenize()?;
        Parser { tokens, pos: 0 }.parse_file()
    }

    pub fn get(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// 按 id 顺序返回给定类型的实例
    pub fn entities_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a StepEntity> + 'a {
        self.entities.values().filter(move |e| e.type_name == type_name)
    }

    /// 头段 `FILE_SCHEMA` 中的第一个模式名
    pub fn schema(&self) -> Option<String> {
        let entity = self.header.iter().find(|e| e.type_name == "FILE_SCHEMA")?;
        let first = entity.arg(0)?.as_list()?.first()?.as_bytes()?;
        Some(String::from_utf8_lossy(first).into_owned())
    }
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, entity_id: Option<u64>) -> Result<(), StepError> {
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            Some(t) => Err(StepError::parser(
                entity_id,
                format!("expected {expected:?}, got {t:?}"),
            )),
            None => Err(StepError::parser(
                entity_id,
                format!("expected {expected:?}, got end of file"),
            )),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), StepError> {
        self.expect(&Token::Keyword(keyword.to_string()), None)?;
        self.expect(&Token::Semicolon, None)
    }

    fn parse_file(mut self) -> Result<StepModel, StepError> {
        let mut model = StepModel::default();

        self.expect_keyword("ISO-10303-21")?;
        self.expect_keyword("HEADER")?;
        while let Some(Token::Keyword(name)) = self.peek().cloned() {
            if name == "ENDSEC" {
                break;
            }
            self.pos += 1;
            let args = self.parse_arguments(None)?;
            self.expect(&Token::Semicolon, None)?;
            model.header.push(StepEntity {
                id: 0,
                type_name: name,
                args,
            });
        }
        self.expect_keyword("ENDSEC")?;

        self.expect_keyword("DATA")?;
        while let Some(Token::EntityRef(id)) = self.peek().cloned() {
            self.pos += 1;
            let entity = self.parse_instance(id)?;
            if model.entities.insert(id, entity).is_some() {
                return Err(StepError::parser(Some(id), "duplicate instance"));
            }
        }
        self.expect_keyword("ENDSEC")?;
        self.expect_keyword("END-ISO-10303-21")?;

        Ok(model)
    }

    fn parse_instance(&mut self, id: u64) -> Result<StepEntity, StepError> {
        self.expect(&Token::Equals, Some(id))?;
        let entity = match self.next() {
            Some(Token::Keyword(type_name)) => StepEntity {
                id,
                type_name,
                args: self.parse_arguments(Some(id))?,
            },
            Some(Token::LParen) => {
                let mut parts = Vec::new();
                while let Some(Token::Keyword(type_name)) = self.peek().cloned() {
                    self.pos += 1;
                    let args = self.parse_arguments(Some(id))?;
                    parts.push(StepValue::Typed { type_name, args });
                }
                self.expect(&Token::RParen, Some(id))?;
                StepEntity {
                    id,
                    type_name: String::new(),
                    args: parts,
                }
            }
            other => {
                return Err(StepError::parser(
                    Some(id),
                    format!("expected entity type, got {other:?}"),
                ))
            }
        };
        self.expect(&Token::Semicolon, Some(id))?;
        Ok(entity)
    }

    /// `(` 参数列表 `)`
    fn parse_arguments(&mut self, entity_id: Option<u64>) -> Result<Vec<StepValue>, StepError> {
        self.expect(&Token::LParen, entity_id)?;
        let mut values = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(values);
        }
        loop {
            values.push(self.parse_value(entity_id)?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(values),
                other => {
                    return Err(StepError::parser(
                        entity_id,
                        format!("expected ',' or ')', got {other:?}"),
                    ))
                }
            }
        }
    }

    fn parse_value(&mut self, entity_id: Option<u64>) -> Result<StepValue, StepError> {
        match self.peek().cloned() {
            Some(Token::LParen) => Ok(StepValue::List(self.parse_arguments(entity_id)?)),
            Some(Token::Keyword(type_name)) => {
                self.pos += 1;
                let args = self.parse_arguments(entity_id)?;
                Ok(StepValue::Typed { type_name, args })
            }
            Some(token) => {
                self.pos += 1;
                match token {
                    Token::EntityRef(id) => Ok(StepValue::EntityRef(id)),
                    Token::String(s) => Ok(StepValue::String(s)),
                    Token::Real(v) => Ok(StepValue::Real(v)),
                    Token::Integer(v) => Ok(StepValue::Integer(v)),
                    Token::Enum(e) => Ok(StepValue::Enum(e)),
                    Token::Asterisk => Ok(StepValue::Derived),
                    Token::Dollar => Ok(StepValue::Null),
                    other => Err(StepError::parser(
                        entity_id,
                        format!("unexpected token {other:?}"),
                    )),
                }
            }
            None => Err(StepError::parser(entity_id, "unexpected end of file")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('test'),'2;1');
FILE_NAME('a.stp','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));
ENDSEC;
DATA;
#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT(.MILLI.,.METRE.));
#3=POLY_LOOP('',(#1,#1,#1));
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_parse_minimal_file() {
        let model = StepModel::parse(MINIMAL.as_bytes()).expect("parse");
        assert_eq!(model.header.len(), 3);
        assert_eq!(model.schema().as_deref(), Some("CONFIG_CONTROL_DESIGN"));
        assert_eq!(model.entities.len(), 3);

        let point = model.get(1).expect("#1");
        assert_eq!(point.type_name, "CARTESIAN_POINT");
        let coords = point.arg(1).and_then(StepValue::as_list).expect("coords");
        assert_eq!(coords.len(), 3);

        let complex = model.get(2).expect("#2");
        assert!(complex.type_name.is_empty());
        assert_eq!(complex.args.len(), 3);
        assert_eq!(model.entities_of_type("POLY_LOOP").count(), 1);
    }

    #[test]
    fn test_truncated_data_section_is_error() {
        let truncated = &MINIMAL[..MINIMAL.find("#3=").expect("marker")];
        assert!(StepModel::parse(truncated.as_bytes()).is_err());
    }

    #[test]
    fn test_duplicate_instance_is_error() {
        let dup = MINIMAL.replace("#3=POLY_LOOP", "#1=POLY_LOOP");
        let err = StepModel::parse(dup.as_bytes()).unwrap_err();
        assert!(matches!(err, StepError::Parser { entity_id: Some(1), .. }));
    }
}
