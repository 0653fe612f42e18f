//! 过滤条件树，以及它对应的服务端 JSON 线格式
//!
//! ```text
//! Leaf   -> {"<field>": ["<op>", "<value>"]}
//! Chain  -> {"<field>": [["<op>", "<new>"], ["<op>", "<old>"], "and"|"or"]}
//! Logic  -> {"_logic": "and"|"or", "0": <left>, "1": <right>}
//! ```

use crate::operator::OperatorTag;
use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};
use std::fmt;

/// 逻辑节点使用的键
pub const LOGIC_KEY: &str = "_logic";
/// 左操作数的键
pub const LEFT_KEY: &str = "0";
/// 右操作数的键
pub const RIGHT_KEY: &str = "1";

/// 逻辑连接词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个比较条件, 例如：`age >= 18`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub operator: OperatorTag,
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: OperatorTag, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// 序列化为 `["<op>", "<value>"]`
struct Comparison<'a>(&'a Condition);

impl Serialize for Comparison<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.0.operator)?;
        tuple.serialize_element(&self.0.value)?;
        tuple.end()
    }
}

/// 序列化为 `[[op, new], [op, old], logic]`
struct ChainValue<'a> {
    latest: &'a Condition,
    earlier: &'a Condition,
    logic: Connective,
}

impl Serialize for ChainValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&Comparison(self.latest))?;
        tuple.serialize_element(&Comparison(self.earlier))?;
        tuple.serialize_element(&self.logic)?;
        tuple.end()
    }
}

/// 过滤条件树的节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    /// 叶子节点：一个比较条件
    Leaf(Condition),
    /// 同一字段在同一个逻辑节点下出现两次时折叠成的链
    Chain {
        latest: Condition,
        earlier: Condition,
        logic: Connective,
    },
    /// 二元逻辑节点，左右顺序与原文一致
    Logic {
        operator: Connective,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
}

impl FilterNode {
    /// 合并两个操作数
    ///
    /// 两侧都是同一字段的叶子时折叠为 `Chain`，否则生成 `Logic` 节点。
    pub fn combine(operator: Connective, left: FilterNode, right: FilterNode) -> FilterNode {
        match (left, right) {
            (FilterNode::Leaf(earlier), FilterNode::Leaf(latest)) if earlier.field == latest.field => {
                FilterNode::Chain {
                    latest,
                    earlier,
                    logic: operator,
                }
            }
            (left, right) => FilterNode::Logic {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// 按出现顺序收集所有字段名（不去重）
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a str>) {
        match self {
            FilterNode::Leaf(condition) => fields.push(&condition.field),
            FilterNode::Chain { latest, .. } => fields.push(&latest.field),
            FilterNode::Logic { left, right, .. } => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
        }
    }

    /// 返回一棵字段名被 `rename` 替换后的新树
    pub fn map_fields<F>(&self, rename: &F) -> FilterNode
    where
        F: Fn(&str) -> String,
    {
        let renamed = |condition: &Condition| Condition {
            field: rename(&condition.field),
            ..condition.clone()
        };
        match self {
            FilterNode::Leaf(condition) => FilterNode::Leaf(renamed(condition)),
            FilterNode::Chain {
                latest,
                earlier,
                logic,
            } => FilterNode::Chain {
                latest: renamed(latest),
                earlier: renamed(earlier),
                logic: *logic,
            },
            FilterNode::Logic {
                operator,
                left,
                right,
            } => FilterNode::Logic {
                operator: *operator,
                left: Box::new(left.map_fields(rename)),
                right: Box::new(right.map_fields(rename)),
            },
        }
    }

    /// 转换为线格式的 JSON 值
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl Serialize for FilterNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FilterNode::Leaf(condition) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(&condition.field, &Comparison(condition))?;
                map.end()
            }
            FilterNode::Chain {
                latest,
                earlier,
                logic,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    &latest.field,
                    &ChainValue {
                        latest,
                        earlier,
                        logic: *logic,
                    },
                )?;
                map.end()
            }
            FilterNode::Logic {
                operator,
                left,
                right,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry(LOGIC_KEY, operator)?;
                map.serialize_entry(LEFT_KEY, left.as_ref())?;
                map.serialize_entry(RIGHT_KEY, right.as_ref())?;
                map.end()
            }
        }
    }
}
