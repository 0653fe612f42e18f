//! 字段映射模块，负责用户字段名与服务端字段名之间的相互转换
//!
//! 查不到的字段原样返回，表中没有的字段（包括已经是服务端名称的字段）直接透传。

use std::collections::HashMap;
use std::sync::OnceLock;

/// 按实体划分的 `(用户字段, 服务端字段)` 映射表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapTable {
    entities: HashMap<String, Vec<(String, String)>>,
}

/// 客户端内置的字段映射
const BUILTIN: &[(&str, &[(&str, &str)])] = &[
    ("department", &[("id", "dept_id"), ("name", "dept_name")]),
    ("avatar", &[("id", "avatar_id")]),
    (
        "user",
        &[
            ("id", "user_id"),
            ("email", "user_email"),
            ("login", "user_login"),
            ("name", "nickname"),
            ("status", "user_status"),
        ],
    ),
    (
        "project",
        &[
            ("id", "p_id"),
            ("sub_date", "p_sub"),
            ("due_date", "p_due"),
            ("description", "p_description"),
            ("name", "p_name"),
            ("status", "p_status"),
        ],
    ),
    (
        "episode",
        &[
            ("id", "epis_id"),
            ("name", "epis_name"),
            ("project_id", "p_id"),
            ("status", "status_id"),
        ],
    ),
    (
        "sequence",
        &[
            ("id", "sequenceid"),
            ("name", "seq_name"),
            ("episode_id", "epis_id"),
            ("project_id", "p_id"),
            ("status", "status_id"),
        ],
    ),
    (
        "shot",
        &[
            ("id", "item_id"),
            ("name", "item_name"),
            ("project_id", "p_id"),
            ("sequence_id", "sequenceid"),
        ],
    ),
    (
        "asset",
        &[("id", "item_id"), ("name", "item_name"), ("project_id", "p_id")],
    ),
    (
        "task",
        &[
            ("id", "task_id"),
            ("name", "content"),
            ("step_id", "type_id"),
            ("project_id", "p_id"),
        ],
    ),
    ("template", &[("name", "temp_name")]),
    (
        "step",
        &[
            ("id", "type_id"),
            ("name", "type_name"),
            ("color", "type_color"),
            ("department_id", "dept_id"),
        ],
    ),
    (
        "status",
        &[
            ("id", "status_id"),
            ("name", "status_name"),
            ("icon", "status_icon"),
            ("color", "status_color"),
        ],
    ),
    ("thumbnail", &[("id", "thmub_id"), ("images", "thumb")]),
    ("category", &[("id", "category_id"), ("name", "category_name")]),
    ("tag", &[("id", "tag_id"), ("name", "tag_name")]),
    ("version", &[("id", "version_id"), ("project_id", "p_id")]),
];

impl FieldMapTable {
    pub fn new(entities: HashMap<String, Vec<(String, String)>>) -> Self {
        Self { entities }
    }

    /// 进程内共享的内置映射表，首次使用时构建，之后只读
    pub fn builtin() -> &'static FieldMapTable {
        static TABLE: OnceLock<FieldMapTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let entities = BUILTIN
                .iter()
                .map(|(entity, pairs)| {
                    let pairs = pairs
                        .iter()
                        .map(|(user, server)| (user.to_string(), server.to_string()))
                        .collect();
                    (entity.to_string(), pairs)
                })
                .collect();
            FieldMapTable { entities }
        })
    }

    /// 实体的映射对列表，未配置的实体返回空列表
    pub fn pairs(&self, entity: &str) -> &[(String, String)] {
        self.entities.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// 用户字段名转换为服务端字段名
    pub fn demap_field<'a>(&'a self, entity: &str, user_field: &'a str) -> &'a str {
        self.pairs(entity)
            .iter()
            .find(|(user, _)| user == user_field)
            .map(|(_, server)| server.as_str())
            .unwrap_or(user_field)
    }

    /// 服务端字段名转换为用户字段名
    pub fn map_field<'a>(&'a self, entity: &str, server_field: &'a str) -> &'a str {
        self.pairs(entity)
            .iter()
            .find(|(_, server)| server == server_field)
            .map(|(user, _)| user.as_str())
            .unwrap_or(server_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demap_and_map() {
        let table = FieldMapTable::builtin();
        assert_eq!(table.demap_field("task", "name"), "content");
        assert_eq!(table.map_field("task", "content"), "name");
        assert_eq!(table.demap_field("department", "id"), "dept_id");
        assert_eq!(table.map_field("user", "user_login"), "login");
    }

    #[test]
    fn test_unmapped_passes_through() {
        let table = FieldMapTable::builtin();
        assert_eq!(table.demap_field("task", "due_date"), "due_date");
        assert_eq!(table.map_field("task", "due_date"), "due_date");
        assert_eq!(table.demap_field("no_such_entity", "id"), "id");
        assert_eq!(table.map_field("no_such_entity", "id"), "id");
    }

    #[test]
    fn test_round_trip_every_pair() {
        let table = FieldMapTable::builtin();
        for entity in table.entities() {
            for (user, server) in table.pairs(entity) {
                assert_eq!(table.demap_field(entity, table.map_field(entity, server)), server);
                assert_eq!(table.map_field(entity, table.demap_field(entity, user)), user);
            }
        }
    }

    #[test]
    fn test_custom_table() {
        let mut entities = HashMap::new();
        entities.insert(
            "shot".to_string(),
            vec![("code".to_string(), "shot_code".to_string())],
        );
        let table = FieldMapTable::new(entities);
        assert_eq!(table.demap_field("shot", "code"), "shot_code");
        assert_eq!(table.demap_field("shot", "id"), "id");
    }
}
