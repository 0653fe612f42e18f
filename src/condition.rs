//! 将单个条件（例如 `age >= 18`）拆分为字段、运算符和取值

use crate::ast::Condition;
use crate::error::ParseError;
use crate::operator::find_operators;
use crate::value::normalize_value;

/// 解析不含连接词的单个条件
///
/// 取值会经过 [`normalize_value`] 处理，非法日期字面量返回 [`ParseError::InvalidDate`]。
pub fn parse_condition(text: &str) -> Result<Condition, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyCondition);
    }

    let found = find_operators(text);
    let operator = match found.as_slice() {
        [] => return Err(ParseError::missing_operator(text.trim())),
        [single] => *single,
        _ => return Err(ParseError::ambiguous_operator(text.trim())),
    };

    let field = text[..operator.start].trim();
    let value = text[operator.end..].trim();

    if field.is_empty() {
        return Err(ParseError::EmptyField {
            condition: text.trim().to_string(),
        });
    }
    if value.is_empty() {
        return Err(ParseError::EmptyValue {
            condition: text.trim().to_string(),
        });
    }

    Ok(Condition::new(field, operator.tag, normalize_value(value)?))
}
