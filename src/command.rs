//! 请求参数构建，每种操作类型对应一种
//!
//! [`Command`] 会被转换为提交到 `<controller>/<method>` 的表单字段，
//! 嵌套的值以 JSON 字符串形式传递。

use crate::error::{Result, ValidationError};
use crate::formatter::{QueryFormatter, QueryPayload};
use crate::schema::{EntitySchema, OperationKind};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 创建实体时未指定状态所使用的默认状态字段和值
const DEFAULT_STATUS: &[(&str, &str, i64)] = &[
    ("task", "status_id", 1),
    ("asset", "status_id", 1),
    ("shot", "status_id", 1),
    ("sequence", "status_id", 1),
    ("episode", "status_id", 1),
    ("project", "p_status", 10),
];

/// 头像按所属用户上传，而不是按头像自身主键
const AVATAR_OWNER_KEY: &str = "user_id";

/// 带有用户侧参数的实体操作
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Query {
        filters: Option<String>,
        fields: Option<Vec<String>>,
    },
    Create {
        data: Map<String, Value>,
    },
    Update {
        id: i64,
        fields: Map<String, Value>,
    },
    Upload {
        entity_id: i64,
        path: PathBuf,
    },
    Custom {
        project_id: i64,
    },
}

/// 单次请求的表单字段，以及上传时附带的文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPayload {
    pub form: BTreeMap<String, String>,
    pub upload: Option<PathBuf>,
}

impl RequestPayload {
    fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.form.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }
}

impl Command {
    pub fn kind(&self) -> OperationKind {
        match self {
            Command::Query { .. } => OperationKind::Query,
            Command::Create { .. } => OperationKind::Create,
            Command::Update { .. } => OperationKind::Update,
            Command::Upload { .. } => OperationKind::Upload,
            Command::Custom { .. } => OperationKind::Custom,
        }
    }

    /// 按实体 schema 构建该命令的请求参数
    pub fn build(&self, formatter: &QueryFormatter<'_>, schema: &EntitySchema) -> Result<RequestPayload> {
        let mut payload = RequestPayload::default();

        match self {
            Command::Query { filters, fields } => {
                if let Some(filters) = filters {
                    let filter = formatter.format_filters(filters, schema)?;
                    payload.insert("filters", filter.to_string());
                }
                // 服务端要求查询必须带 fields 参数
                let fields = match fields {
                    Some(fields) => formatter.format_fields(fields.as_slice(), schema)?,
                    None => QueryPayload::empty(&schema.name),
                };
                payload.insert("fields", fields.to_json());
            }
            Command::Create { data } => {
                if data.is_empty() {
                    return Err(missing("data"));
                }
                let mut fields = formatter.demap_object(&schema.name, data);
                if let Some((_, status_field, status)) = DEFAULT_STATUS
                    .iter()
                    .find(|(entity, _, _)| *entity == schema.name)
                {
                    fields
                        .entry(status_field.to_string())
                        .or_insert_with(|| json!(status));
                }
                let data = json!({"entity": schema.name, "fields": fields});
                payload.insert("data", data.to_string());
            }
            Command::Update { id, fields } => {
                if fields.is_empty() {
                    return Err(missing("fields"));
                }
                let data = json!({
                    "entity": schema.name,
                    "primary": {"key": schema.primary_field, "value": ["eq", id]},
                    "fields": formatter.demap_object(&schema.name, fields),
                });
                payload.insert("data", data.to_string());
            }
            Command::Upload { entity_id, path } => {
                let key = if schema.name == "avatar" {
                    AVATAR_OWNER_KEY
                } else {
                    schema.primary_field.as_str()
                };
                let mut data = Map::new();
                data.insert("entity".to_string(), json!(schema.name));
                data.insert(key.to_string(), json!(entity_id));
                payload.insert("data", Value::Object(data).to_string());
                payload.upload = Some(path.clone());
            }
            Command::Custom { project_id } => {
                payload.insert("project_id", project_id.to_string());
            }
        }

        tracing::debug!(entity = %schema.name, kind = ?self.kind(), "Built request payload");
        Ok(payload)
    }
}

fn missing(name: &str) -> crate::error::Error {
    ValidationError::MissingArgument {
        name: name.to_string(),
    }
    .into()
}
