//! Strack 查询编译器
//!
//! 将 `a = 1 and (b > 2 or c like x)` 这类过滤表达式编译为 Strack API 需要的嵌套条件树，
//! 并在用户字段名和服务端字段名之间转换。
//!
//! ```
//! use strack_query::{EntitySchema, FieldMapTable, QueryFormatter};
//! use serde_json::json;
//!
//! let schema = EntitySchema::new("task", "task_id")
//!     .with_fields(["id", "name"])
//!     .with_relations(["department"]);
//! let formatter = QueryFormatter::new(FieldMapTable::builtin());
//!
//! let filter = formatter.format_filters("name = layout or id >= 10", &schema).unwrap();
//! assert_eq!(
//!     filter,
//!     json!({"_logic": "or", "0": {"content": ["eq", "layout"]}, "1": {"task_id": ["egt", "10"]}})
//! );
//!
//! let fields = formatter.format_fields(&["name", "department.name"], &schema).unwrap();
//! assert_eq!(
//!     fields.to_json(),
//!     r#"{"main":{"entity":"task","fields":"content"},"relation":[{"entity":"department","fields":"dept_name"}]}"#
//! );
//! ```

pub mod ast;
pub mod command;
pub mod condition;
pub mod config;
pub mod error;
pub mod field_map;
pub mod formatter;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod schema;
pub mod token;
pub mod value;

pub use ast::{Condition, Connective, FilterNode};
pub use command::{Command, RequestPayload};
pub use error::{ConfigError, Error, ParseError, Result, ValidationError};
pub use field_map::FieldMapTable;
pub use formatter::{EntityFields, QueryFormatter, QueryPayload};
pub use operator::OperatorTag;
pub use parser::parse_filter_expression;
pub use schema::{EntitySchema, OperationKind, SchemaRegistry};
