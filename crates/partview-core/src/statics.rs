//! 接口静态变量
//!
//! 交换格式读写器通过字符串键读取的全局调参变量。
//! 例如 `write.step.schema`、`read.iges.bspline.continuity`。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 静态变量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StaticValue {
    Integer(i32),
    Real(f64),
    Text(String),
}

impl From<i32> for StaticValue {
    fn from(v: i32) -> Self {
        StaticValue::Integer(v)
    }
}

impl From<bool> for StaticValue {
    fn from(v: bool) -> Self {
        StaticValue::Integer(i32::from(v))
    }
}

impl From<f64> for StaticValue {
    fn from(v: f64) -> Self {
        StaticValue::Real(v)
    }
}

impl From<&str> for StaticValue {
    fn from(v: &str) -> Self {
        StaticValue::Text(v.to_string())
    }
}

impl From<String> for StaticValue {
    fn from(v: String) -> Self {
        StaticValue::Text(v)
    }
}

/// 静态变量表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceStatic {
    values: BTreeMap<String, StaticValue>,
}

impl InterfaceStatic {
    pub fn new() -> Self {
        Self::default()
    }

    /// 仅在键不存在时登记默认值
    pub fn init(&mut self, key: &str, value: impl Into<StaticValue>) {
        if !self.values.contains_key(key) {
            self.values.insert(key.to_string(), value.into());
        }
    }

    /// 设置值，返回旧值
    pub fn set(&mut self, key: &str, value: impl Into<StaticValue>) -> Option<StaticValue> {
        self.values.insert(key.to_string(), value.into())
    }

    /// 删除键，返回旧值
    pub fn remove(&mut self, key: &str) -> Option<StaticValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&StaticValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 整数值
    pub fn ival(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            StaticValue::Integer(v) => Some(*v),
            StaticValue::Real(_) | StaticValue::Text(_) => None,
        }
    }

    /// 实数值，整数会被提升
    pub fn rval(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            StaticValue::Real(v) => Some(*v),
            StaticValue::Integer(v) => Some(f64::from(*v)),
            StaticValue::Text(_) => None,
        }
    }

    /// 文本值
    pub fn cval(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            StaticValue::Text(v) => Some(v),
            StaticValue::Integer(_) | StaticValue::Real(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
