//! 将二元取值中的反引号日期字面量转换为时间戳（秒）
//!
//! ```text
//! `2020-01-01`,`now`          -> 1577836800,<当前时间戳>
//! `2020-01-01 08:30:00`,100   -> 1577867400,100
//! ```
//!
//! 只处理恰好包含一个逗号的取值，其余情况原样返回，单独的反引号字面量也不处理。

use crate::error::ParseError;
use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn date_literal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^`(\d{4}-\d{2}-\d{2}( \d{2}:\d{2}:\d{2})?|now)`").expect("Invalid regex")
    })
}

/// 以本地当前时间作为 `now` 规范化条件取值
pub fn normalize_value(raw: &str) -> Result<String, ParseError> {
    normalize_value_at(raw, Local::now().naive_local())
}

/// 规范化条件取值，`now` 解析为给定时间
///
/// 形如日期但不是合法日历日期的字面量（例如 `` `2020-02-30` ``）返回
/// [`ParseError::InvalidDate`]。
pub fn normalize_value_at(raw: &str, now: NaiveDateTime) -> Result<String, ParseError> {
    if raw.matches(',').count() != 1 {
        return Ok(raw.to_string());
    }

    let parts = raw
        .split(',')
        .map(|part| -> Result<String, ParseError> {
            Ok(match resolve_literal(part.trim(), now)? {
                Some(epoch) => epoch.to_string(),
                None => part.to_string(),
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(parts.join(","))
}

/// 将单个反引号字面量转换为时间戳；不是日期字面量时返回 `None`
fn resolve_literal(token: &str, now: NaiveDateTime) -> Result<Option<i64>, ParseError> {
    let Some(captures) = date_literal().captures(token) else {
        return Ok(None);
    };
    let Some(literal) = captures.get(1).map(|m| m.as_str()) else {
        return Ok(None);
    };

    let invalid = || ParseError::InvalidDate {
        literal: format!("`{literal}`"),
    };

    let datetime = if literal == "now" {
        now
    } else if captures.get(2).is_some() {
        NaiveDateTime::parse_from_str(literal, DATETIME_FORMAT).map_err(|_| invalid())?
    } else {
        NaiveDate::parse_from_str(literal, "%Y-%m-%d")
            .map_err(|_| invalid())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?
    };

    Ok(Some(to_epoch(datetime)))
}

/// 自 1970-01-01T00:00:00 起的秒数，墙上时间按 UTC 计算
pub fn to_epoch(datetime: NaiveDateTime) -> i64 {
    datetime.and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2021-06-15 12:00:00", DATETIME_FORMAT).unwrap()
    }

    #[test]
    fn test_date_range_to_epoch() {
        let value = normalize_value_at("`2020-01-01`,`2020-01-02`", fixed_now()).unwrap();
        assert_eq!(value, "1577836800,1577923200");
    }

    #[test]
    fn test_datetime_used_as_is() {
        let value = normalize_value_at("`2020-01-01 08:30:00`,100", fixed_now()).unwrap();
        assert_eq!(value, "1577867400,100");
    }

    #[test]
    fn test_now_resolves_to_clock() {
        let value = normalize_value_at("`2020-01-01`, `now`", fixed_now()).unwrap();
        assert_eq!(value, format!("1577836800,{}", to_epoch(fixed_now())));
    }

    #[test]
    fn test_now_against_local_clock() {
        let before = to_epoch(Local::now().naive_local());
        let value = normalize_value("`now`,1").unwrap();
        let after = to_epoch(Local::now().naive_local());

        let (epoch, rest) = value.split_once(',').unwrap();
        let epoch: i64 = epoch.parse().unwrap();
        assert!(before <= epoch && epoch <= after + 1);
        assert_eq!(rest, "1");
    }

    #[test]
    fn test_plain_operands_unchanged() {
        assert_eq!(normalize_value_at("1, 5", fixed_now()).unwrap(), "1, 5");
        assert_eq!(normalize_value_at("a,b", fixed_now()).unwrap(), "a,b");
    }

    #[test]
    fn test_only_one_comma_is_rewritten() {
        assert_eq!(
            normalize_value_at("`2020-01-01`", fixed_now()).unwrap(),
            "`2020-01-01`"
        );
        assert_eq!(
            normalize_value_at("`2020-01-01`,`now`,3", fixed_now()).unwrap(),
            "`2020-01-01`,`now`,3"
        );
    }

    #[test]
    fn test_invalid_calendar_date_rejected() {
        assert_eq!(
            normalize_value_at("`2020-02-30`,`now`", fixed_now()),
            Err(ParseError::InvalidDate {
                literal: "`2020-02-30`".to_string()
            })
        );
        assert_eq!(
            normalize_value_at("1,`2020-13-45`", fixed_now()),
            Err(ParseError::InvalidDate {
                literal: "`2020-13-45`".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_time_of_day_rejected() {
        assert!(matches!(
            normalize_value_at("`2020-01-01 25:00:00`,1", fixed_now()),
            Err(ParseError::InvalidDate { .. })
        ));
    }
}
