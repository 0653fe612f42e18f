//! 比较运算符表，条件解析和输出格式共用

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// 服务端识别的运算符标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorTag {
    Gt,
    Egt,
    Lt,
    Elt,
    Eq,
    Neq,
    In,
    NotIn,
    Like,
    NotLike,
    Between,
    NotBetween,
}

impl OperatorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorTag::Gt => "gt",
            OperatorTag::Egt => "egt",
            OperatorTag::Lt => "lt",
            OperatorTag::Elt => "elt",
            OperatorTag::Eq => "eq",
            OperatorTag::Neq => "neq",
            OperatorTag::In => "in",
            OperatorTag::NotIn => "not in",
            OperatorTag::Like => "like",
            OperatorTag::NotLike => "not like",
            OperatorTag::Between => "between",
            OperatorTag::NotBetween => "not between",
        }
    }
}

impl fmt::Display for OperatorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperatorTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 运算符文本及其对应的标识
///
/// 单词运算符带有前后空格，避免 `in` 匹配到 `login` 这类字段名内部。
pub const OPERATORS: &[(&str, OperatorTag)] = &[
    (">", OperatorTag::Gt),
    (">=", OperatorTag::Egt),
    ("<", OperatorTag::Lt),
    ("<=", OperatorTag::Elt),
    ("=", OperatorTag::Eq),
    ("==", OperatorTag::Eq),
    ("!=", OperatorTag::Neq),
    ("<>", OperatorTag::Neq),
    (" in ", OperatorTag::In),
    (" not in ", OperatorTag::NotIn),
    (" like ", OperatorTag::Like),
    (" not like ", OperatorTag::NotLike),
    (" between ", OperatorTag::Between),
    (" not between ", OperatorTag::NotBetween),
];

/// 按文本长度降序排列的运算符表，只构建一次
fn candidates() -> &'static [(&'static str, OperatorTag)] {
    static SORTED: OnceLock<Vec<(&'static str, OperatorTag)>> = OnceLock::new();
    SORTED.get_or_init(|| {
        let mut sorted = OPERATORS.to_vec();
        // 稳定排序：长度相同时保持原表顺序
        sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        sorted
    })
}

/// 精确查找运算符文本，单词运算符忽略 ASCII 大小写
pub fn lookup(token: &str) -> Option<OperatorTag> {
    candidates()
        .iter()
        .find(|(text, _)| text.eq_ignore_ascii_case(token))
        .map(|(_, tag)| *tag)
}

/// 条件文本中的一处运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorMatch {
    /// 运算符起始字节偏移
    pub start: usize,
    /// 运算符结束后的字节偏移
    pub end: usize,
    pub tag: OperatorTag,
}

/// 从左到右查找所有不重叠的运算符，每个位置优先匹配最长的运算符
pub fn find_operators(text: &str) -> Vec<OperatorMatch> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut position = 0;

    while position < bytes.len() {
        let hit = candidates().iter().find(|(token, _)| {
            let token = token.as_bytes();
            bytes.len() - position >= token.len()
                && bytes[position..position + token.len()].eq_ignore_ascii_case(token)
        });

        match hit {
            Some((token, tag)) => {
                found.push(OperatorMatch {
                    start: position,
                    end: position + token.len(),
                    tag: *tag,
                });
                position += token.len();
            }
            None => position += 1,
        }
    }

    found
}
