//! 服务端提供的实体 schema，以及实体支持的操作类型

use crate::field_map::FieldMapTable;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

/// 实体方法对应的固定请求类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Create,
    Update,
    Upload,
    Custom,
}

impl OperationKind {
    /// 根据服务端方法名确定操作类型
    pub fn from_method(method: &str) -> Option<OperationKind> {
        match method.to_ascii_lowercase().as_str() {
            "select" | "find" => Some(OperationKind::Query),
            "create" => Some(OperationKind::Create),
            "update" => Some(OperationKind::Update),
            "upload" => Some(OperationKind::Upload),
            "custom" => Some(OperationKind::Custom),
            _ => None,
        }
    }
}

/// 单个实体的只读描述：主键、自身字段和关联实体
///
/// 自身字段保存的是用户字段名。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntitySchema {
    pub name: String,
    pub primary_field: String,
    pub own_fields: BTreeSet<String>,
    pub relation_names: BTreeSet<String>,
    /// 服务端为该实体提供的方法名
    pub methods: Vec<String>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, primary_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_field: primary_field.into(),
            ..Default::default()
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.own_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relation_names.extend(relations.into_iter().map(Into::into));
        self
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.own_fields.contains(field)
    }

    pub fn has_relation(&self, relation: &str) -> bool {
        self.relation_names.contains(relation)
    }

    /// 实体提供该方法时返回其操作类型
    pub fn operation(&self, method: &str) -> Option<OperationKind> {
        self.methods
            .iter()
            .find(|m| m.eq_ignore_ascii_case(method))
            .and_then(|m| OperationKind::from_method(m))
    }

    /// 根据服务端返回的实体详情构建 schema，字段名转换为用户字段名
    pub fn from_detail(detail: EntityDetail, field_map: &FieldMapTable) -> Self {
        let own_fields = detail
            .fields
            .iter()
            .map(|field| field_map.map_field(&detail.entity, field).to_string())
            .collect();
        let relation_names = detail
            .include
            .map(|include| include.into_keys().collect())
            .unwrap_or_default();
        let methods = detail
            .method_param
            .map(|methods| methods.into_keys().collect())
            .unwrap_or_default();

        Self {
            name: detail.entity,
            primary_field: detail.primary,
            own_fields,
            relation_names,
            methods,
        }
    }
}

/// 服务端实体列表中的一项
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDetail {
    pub entity: String,
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub include: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub controller: Option<String>,
    #[serde(default, rename = "methodParam")]
    pub method_param: Option<HashMap<String, serde_json::Value>>,
}

/// 客户端已知的全部 schema，以实体名为键
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: EntitySchema) {
        self.entities.insert(schema.name.clone(), schema);
    }

    pub fn get(&self, entity: &str) -> Option<&EntitySchema> {
        self.entities.get(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// 解析服务端返回的 `{"<entity>": {<detail>}, ...}` 实体列表
    pub fn from_json_str(json: &str, field_map: &FieldMapTable) -> Result<Self, serde_json::Error> {
        let details: HashMap<String, EntityDetail> = serde_json::from_str(json)?;
        let mut registry = SchemaRegistry::new();
        for detail in details.into_values() {
            registry.insert(EntitySchema::from_detail(detail, field_map));
        }
        Ok(registry)
    }
}

impl FromIterator<EntitySchema> for SchemaRegistry {
    fn from_iter<T: IntoIterator<Item = EntitySchema>>(iter: T) -> Self {
        let mut registry = SchemaRegistry::new();
        for schema in iter {
            registry.insert(schema);
        }
        registry
    }
}
