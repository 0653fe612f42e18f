//! 查询格式化模块，按实体 schema 校验条件树和查询字段，并生成服务端需要的请求参数

use crate::ast::{FilterNode, LEFT_KEY, LOGIC_KEY, RIGHT_KEY};
use crate::error::{Result, ValidationError};
use crate::field_map::FieldMapTable;
use crate::parser::parse_filter_expression;
use crate::schema::{EntitySchema, SchemaRegistry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 过滤条件结构中的保留键，不作为字段名处理
const STRUCTURAL_KEYS: [&str; 3] = [LOGIC_KEY, LEFT_KEY, RIGHT_KEY];

/// 格式化结果记录时附加的实体类型键
const TYPE_KEY: &str = "type";

/// fields 参数中的一条 `{"entity", "fields"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFields {
    pub entity: String,
    /// 逗号连接的服务端字段名
    pub fields: String,
}

/// 查询请求的 `fields` 参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPayload {
    pub main: EntityFields,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relation: Vec<EntityFields>,
}

impl QueryPayload {
    /// 主实体字段为空的参数，服务端要求每次查询都带上
    pub fn empty(entity: impl Into<String>) -> Self {
        Self {
            main: EntityFields {
                entity: entity.into(),
                fields: String::new(),
            },
            relation: Vec::new(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// 基于一张字段映射表格式化过滤条件、查询字段和结果记录
pub struct QueryFormatter<'a> {
    field_map: &'a FieldMapTable,
    /// 已知关联实体 schema 时用于校验关联子字段
    schemas: Option<&'a SchemaRegistry>,
}

impl<'a> QueryFormatter<'a> {
    pub fn new(field_map: &'a FieldMapTable) -> Self {
        Self {
            field_map,
            schemas: None,
        }
    }

    pub fn with_schemas(mut self, schemas: &'a SchemaRegistry) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn field_map(&self) -> &'a FieldMapTable {
        self.field_map
    }

    /// 解析过滤表达式并格式化得到的条件树
    pub fn format_filters(&self, expression: &str, schema: &EntitySchema) -> Result<Value> {
        let tree = parse_filter_expression(expression)?;
        Ok(self.format_filter_tree(tree.as_ref(), schema)?)
    }

    /// 校验条件树引用的每个字段，并以服务端字段名输出
    ///
    /// 没有条件树时输出 `{}`。
    pub fn format_filter_tree(
        &self,
        tree: Option<&FilterNode>,
        schema: &EntitySchema,
    ) -> std::result::Result<Value, ValidationError> {
        let Some(tree) = tree else {
            return Ok(Value::Object(Map::new()));
        };

        let mut server_keys = HashMap::new();
        for field in tree.fields() {
            if !server_keys.contains_key(field) {
                server_keys.insert(field, self.filter_key(field, schema)?);
            }
        }
        tracing::debug!(entity = %schema.name, fields = server_keys.len(), "Formatted filter");

        let mapped = tree.map_fields(&|field: &str| {
            server_keys
                .get(field)
                .cloned()
                .unwrap_or_else(|| field.to_string())
        });
        Ok(mapped.to_wire())
    }

    /// 校验单个过滤字段并返回其服务端名称
    fn filter_key(
        &self,
        field: &str,
        schema: &EntitySchema,
    ) -> std::result::Result<String, ValidationError> {
        let invalid = || ValidationError::InvalidFilterField {
            entity: schema.name.clone(),
            field: field.to_string(),
        };

        if STRUCTURAL_KEYS.contains(&field) {
            return Ok(field.to_string());
        }

        if let Some((relation, subfield)) = field.split_once('.') {
            if subfield.contains('.') {
                return Err(ValidationError::MalformedField {
                    field: field.to_string(),
                });
            }
            if !schema.has_relation(relation) || !self.relation_has_field(relation, subfield) {
                return Err(invalid());
            }
            let subfield = self.field_map.demap_field(relation, subfield);
            return Ok(format!("{relation}.{subfield}"));
        }

        let user_field = self.field_map.map_field(&schema.name, field);
        if !schema.has_field(user_field) && !schema.has_relation(user_field) {
            return Err(invalid());
        }
        Ok(self.field_map.demap_field(&schema.name, field).to_string())
    }

    /// 关联实体 schema 未知，或其字段中包含该子字段
    fn relation_has_field(&self, relation: &str, subfield: &str) -> bool {
        match self.schemas.and_then(|schemas| schemas.get(relation)) {
            Some(relation_schema) => {
                relation_schema.has_field(self.field_map.map_field(relation, subfield))
            }
            None => true,
        }
    }

    /// 将查询字段拆分为主实体字段和按关联实体合并的字段列表，字段名都转换为服务端名称
    pub fn format_fields<S: AsRef<str>>(
        &self,
        fields: &[S],
        schema: &EntitySchema,
    ) -> std::result::Result<QueryPayload, ValidationError> {
        let mut main_fields: Vec<&str> = Vec::new();
        let mut relations: Vec<(String, Vec<String>)> = Vec::new();

        for field in fields {
            let field = field.as_ref();
            if schema.has_field(field) {
                main_fields.push(self.field_map.demap_field(&schema.name, field));
                continue;
            }

            // 关联实体本身，或 relation.field
            let (relation, subfield) = field.split_once('.').unwrap_or((field, ""));
            if subfield.contains('.') {
                return Err(ValidationError::MalformedField {
                    field: field.to_string(),
                });
            }
            if !schema.has_relation(relation) {
                if subfield.is_empty() {
                    return Err(ValidationError::UnknownField {
                        entity: schema.name.clone(),
                        field: field.to_string(),
                    });
                }
                return Err(ValidationError::UnknownRelation {
                    entity: schema.name.clone(),
                    relation: relation.to_string(),
                });
            }
            if !subfield.is_empty() && !self.relation_has_field(relation, subfield) {
                return Err(ValidationError::UnknownField {
                    entity: relation.to_string(),
                    field: subfield.to_string(),
                });
            }

            let position = match relations.iter().position(|(name, _)| name == relation) {
                Some(position) => position,
                None => {
                    relations.push((relation.to_string(), Vec::new()));
                    relations.len() - 1
                }
            };
            if !subfield.is_empty() {
                let subfield = self.field_map.demap_field(relation, subfield);
                relations[position].1.push(subfield.to_string());
            }
        }

        tracing::debug!(
            entity = %schema.name,
            main = main_fields.len(),
            relations = relations.len(),
            "Formatted fields"
        );

        Ok(QueryPayload {
            main: EntityFields {
                entity: schema.name.clone(),
                fields: main_fields.join(","),
            },
            relation: relations
                .into_iter()
                .map(|(entity, fields)| EntityFields {
                    entity,
                    fields: fields.join(","),
                })
                .collect(),
        })
    }

    /// 转换创建、更新请求中字段对象的键名
    pub fn demap_object(&self, entity: &str, object: &Map<String, Value>) -> Map<String, Value> {
        object
            .iter()
            .map(|(field, value)| {
                (
                    self.field_map.demap_field(entity, field).to_string(),
                    value.clone(),
                )
            })
            .collect()
    }

    /// 将服务端结果记录转换回用户字段名，并附加实体类型
    pub fn format_record(&self, record: &Map<String, Value>, schema: &EntitySchema) -> Map<String, Value> {
        let mut formatted = Map::new();

        for (field, value) in record {
            let user_field = self.field_map.map_field(&schema.name, field);
            if schema.has_field(user_field) {
                formatted.insert(user_field.to_string(), value.clone());
            } else if schema.has_relation(field) {
                let nested = match value {
                    Value::Object(object) => Value::Object(
                        object
                            .iter()
                            .map(|(key, value)| {
                                (self.field_map.map_field(field, key).to_string(), value.clone())
                            })
                            .collect(),
                    ),
                    Value::Null => Value::Object(Map::new()),
                    other => other.clone(),
                };
                formatted.insert(field.clone(), nested);
            } else {
                formatted.insert(field.clone(), value.clone());
            }
        }

        formatted.insert(TYPE_KEY.to_string(), Value::String(schema.name.clone()));
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn task_schema() -> EntitySchema {
        EntitySchema::new("task", "task_id")
            .with_fields(["id", "name", "due_date", "project_id", "assignee"])
            .with_relations(["department", "status", "project"])
    }

    fn create_test_formatter() -> QueryFormatter<'static> {
        QueryFormatter::new(FieldMapTable::builtin())
    }

    #[test]
    fn test_format_fields_main_only() {
        let formatter = create_test_formatter();
        let payload = formatter.format_fields(&["name"], &task_schema()).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"main": {"entity": "task", "fields": "content"}})
        );
    }

    #[test]
    fn test_format_fields_unknown_field() {
        let formatter = create_test_formatter();
        let err = formatter.format_fields(&["bogus"], &task_schema()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownField {
                entity: "task".to_string(),
                field: "bogus".to_string(),
            }
        );
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_format_fields_merges_relation_entries() {
        let formatter = create_test_formatter();
        let payload = formatter
            .format_fields(
                &["department.id", "name", "status", "department.name", "status.icon"],
                &task_schema(),
            )
            .unwrap();

        assert_eq!(payload.main.fields, "content");
        assert_eq!(
            payload.relation,
            vec![
                EntityFields {
                    entity: "department".to_string(),
                    fields: "dept_id,dept_name".to_string(),
                },
                EntityFields {
                    entity: "status".to_string(),
                    fields: "status_icon".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_format_fields_empty() {
        let formatter = create_test_formatter();
        let fields: [&str; 0] = [];
        let payload = formatter.format_fields(&fields, &task_schema()).unwrap();
        assert_eq!(payload, QueryPayload::empty("task"));
        assert_eq!(payload.to_json(), r#"{"main":{"entity":"task","fields":""}}"#);
    }

    #[test]
    fn test_format_fields_malformed() {
        let formatter = create_test_formatter();
        assert!(matches!(
            formatter.format_fields(&["department.a.b"], &task_schema()),
            Err(ValidationError::MalformedField { .. })
        ));
    }

    #[test]
    fn test_relation_subfield_checked_against_registry() {
        let registry: SchemaRegistry = [EntitySchema::new("department", "dept_id")
            .with_fields(["id", "name"])]
        .into_iter()
        .collect();
        let formatter = QueryFormatter::new(FieldMapTable::builtin()).with_schemas(&registry);

        assert!(formatter
            .format_fields(&["department.name"], &task_schema())
            .is_ok());
        assert_eq!(
            formatter.format_fields(&["step.name"], &task_schema()),
            Err(ValidationError::UnknownRelation {
                entity: "task".to_string(),
                relation: "step".to_string(),
            })
        );
        assert_eq!(
            formatter.format_fields(&["department.color"], &task_schema()),
            Err(ValidationError::UnknownField {
                entity: "department".to_string(),
                field: "color".to_string(),
            })
        );
        // status 没有注册 schema，任何子字段都接受
        assert!(formatter
            .format_fields(&["status.whatever"], &task_schema())
            .is_ok());
    }

    #[test]
    fn test_format_filters_demaps_keys() {
        let formatter = create_test_formatter();
        let filter = formatter
            .format_filters("name = layout and project_id = 3", &task_schema())
            .unwrap();
        assert_eq!(
            filter,
            json!({"_logic": "and", "0": {"content": ["eq", "layout"]}, "1": {"p_id": ["eq", "3"]}})
        );
    }

    #[test]
    fn test_format_filters_accepts_server_names() {
        let formatter = create_test_formatter();
        let filter = formatter
            .format_filters("content like %lay%", &task_schema())
            .unwrap();
        assert_eq!(filter, json!({"content": ["like", "%lay%"]}));
    }

    #[test]
    fn test_format_filters_relation_field() {
        let formatter = create_test_formatter();
        let filter = formatter
            .format_filters("department.name = fx", &task_schema())
            .unwrap();
        assert_eq!(filter, json!({"department.dept_name": ["eq", "fx"]}));
    }

    #[test]
    fn test_format_filters_chain_keeps_shape() {
        let formatter = create_test_formatter();
        let filter = formatter
            .format_filters("id = 1 or id = 2", &task_schema())
            .unwrap();
        assert_eq!(filter, json!({"task_id": [["eq", "2"], ["eq", "1"], "or"]}));
    }

    #[test]
    fn test_format_filters_invalid_field() {
        let formatter = create_test_formatter();
        let err = formatter
            .format_filters("name = a and bogus > 1", &task_schema())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidFilterField { ref field, .. }) if field == "bogus"
        ));

        let err = formatter
            .format_filters("avatar.id = 1", &task_schema())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_format_filters_malformed_key() {
        let formatter = create_test_formatter();
        let err = formatter
            .format_filter_tree(
                parse_filter_expression("department.a.b = 1").unwrap().as_ref(),
                &task_schema(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MalformedField {
                field: "department.a.b".to_string(),
            }
        );
    }

    #[test]
    fn test_filter_relation_subfield_checked_against_registry() {
        let registry: SchemaRegistry = [EntitySchema::new("department", "dept_id")
            .with_fields(["id", "name"])]
        .into_iter()
        .collect();
        let formatter = QueryFormatter::new(FieldMapTable::builtin()).with_schemas(&registry);

        let filter = formatter
            .format_filters("department.name = fx", &task_schema())
            .unwrap();
        assert_eq!(filter, json!({"department.dept_name": ["eq", "fx"]}));

        let err = formatter
            .format_filters("department.color = 1", &task_schema())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidFilterField { ref field, .. })
                if field == "department.color"
        ));

        // 未注册的关联实体不检查子字段
        let filter = formatter
            .format_filters("status.whatever = 1", &task_schema())
            .unwrap();
        assert_eq!(filter, json!({"status.whatever": ["eq", "1"]}));
    }

    #[test]
    fn test_format_filters_parse_error() {
        let formatter = create_test_formatter();
        let err = formatter
            .format_filters("name = a and (id = 1", &task_schema())
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_format_filters_empty() {
        let formatter = create_test_formatter();
        let filter = formatter.format_filters("", &task_schema()).unwrap();
        assert_eq!(filter, json!({}));
    }

    #[test]
    fn test_format_record() {
        let formatter = create_test_formatter();
        let record = json!({
            "task_id": 7,
            "content": "layout",
            "department": {"dept_id": 2, "dept_name": "fx"},
            "status": null,
            "extra": true
        });
        let formatted = formatter.format_record(record.as_object().unwrap(), &task_schema());
        assert_eq!(
            Value::Object(formatted),
            json!({
                "id": 7,
                "name": "layout",
                "department": {"id": 2, "name": "fx"},
                "status": {},
                "extra": true,
                "type": "task"
            })
        );
    }

    #[test]
    fn test_demap_object() {
        let formatter = create_test_formatter();
        let object = json!({"name": "layout", "due_date": "2020-01-01"});
        let demapped = formatter.demap_object("task", object.as_object().unwrap());
        assert_eq!(
            Value::Object(demapped),
            json!({"content": "layout", "due_date": "2020-01-01"})
        );
    }
}
