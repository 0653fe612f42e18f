//! 过滤表达式编译器与请求格式化共用的错误类型

use thiserror::Error;

/// crate 公共接口使用的 Result 类型
pub type Result<T> = std::result::Result<T, Error>;

/// 将过滤表达式解析为条件树时产生的错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// 需要条件的位置是空白片段
    #[error("empty condition")]
    EmptyCondition,

    /// 条件中找不到比较运算符
    #[error("invalid expression: no operator in '{condition}'")]
    MissingOperator {
        /// 出错的条件文本
        condition: String,
    },

    /// 条件中出现了多个比较运算符
    #[error("invalid expression: ambiguous operators in '{condition}'")]
    AmbiguousOperator {
        /// 出错的条件文本
        condition: String,
    },

    /// 运算符左侧缺少字段名
    #[error("invalid expression: missing field in '{condition}'")]
    EmptyField {
        /// 出错的条件文本
        condition: String,
    },

    /// 运算符右侧缺少值
    #[error("invalid expression: missing value in '{condition}'")]
    EmptyValue {
        /// 出错的条件文本
        condition: String,
    },

    /// `(` 与 `)` 不匹配
    #[error("unbalanced parenthesis at position {position}")]
    UnbalancedParenthesis {
        /// 未匹配括号的字节偏移
        position: usize,
    },

    /// 出现在不允许位置的 token
    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// token 的原始文本
        token: String,
        /// token 的字节偏移
        position: usize,
    },

    /// 表达式在仍需要操作数的位置结束
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// 反引号中的日期不是合法的日历日期
    #[error("invalid date literal '{literal}'")]
    InvalidDate {
        /// 出错的日期字面量，包含反引号
        literal: String,
    },
}

impl ParseError {
    pub fn missing_operator(condition: impl Into<String>) -> Self {
        ParseError::MissingOperator {
            condition: condition.into(),
        }
    }

    pub fn ambiguous_operator(condition: impl Into<String>) -> Self {
        ParseError::AmbiguousOperator {
            condition: condition.into(),
        }
    }

    pub fn unexpected_token(token: impl Into<String>, position: usize) -> Self {
        ParseError::UnexpectedToken {
            token: token.into(),
            position,
        }
    }
}

/// 查询字段或过滤字段与实体 schema 不符时产生的错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 查询字段既不是实体自身字段也不是关联实体
    #[error("'{field}' is not a valid field of '{entity}'")]
    UnknownField { entity: String, field: String },

    /// 过滤条件中的字段既不是实体自身字段也不是关联实体
    #[error("field '{field}' in filter is not valid for '{entity}'")]
    InvalidFilterField { entity: String, field: String },

    /// `relation.field` 中的 relation 不是该实体的关联
    #[error("'{relation}' is not a relation of '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// 字段名中包含多于一个 `.`
    #[error("malformed field name '{field}'")]
    MalformedField { field: String },

    /// 操作缺少必需的参数
    #[error("required argument '{name}' not found")]
    MissingArgument { name: String },
}

/// 加载字段映射或实体 schema 时产生的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 驱动完整流程的调用方使用的顶层错误
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_fragment() {
        let err = ParseError::missing_operator("age 18");
        assert!(err.to_string().contains("age 18"));
    }

    #[test]
    fn test_invalid_date_names_literal() {
        let err: Error = ParseError::InvalidDate {
            literal: "`2020-02-30`".to_string(),
        }
        .into();
        assert!(err.is_parse());
        assert_eq!(err.to_string(), "invalid date literal '`2020-02-30`'");
    }

    #[test]
    fn test_error_kind_is_branchable() {
        let err: Error = ValidationError::UnknownField {
            entity: "task".to_string(),
            field: "bogus".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_parse());
        assert!(err.to_string().contains("bogus"));
    }
}
