//! 配置模块，负责从JSON文件加载字段映射表和实体 schema

use crate::error::ConfigError;
use crate::field_map::FieldMapTable;
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 字段映射配置结构
///
/// ```json
/// {"task": [["name", "content"], ["id", "task_id"]]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapConfig {
    /// 实体名到 (用户字段, 服务端字段) 列表的映射
    #[serde(flatten)]
    pub mappings: HashMap<String, Vec<(String, String)>>,
}

impl FieldMapConfig {
    /// 从JSON文件加载字段映射配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = read_config(path.as_ref())?;

        let mappings: HashMap<String, Vec<(String, String)>> = serde_json::from_str(&content)
            .map_err(|source| ConfigError::Json {
                path: path.as_ref().display().to_string(),
                source,
            })?;

        tracing::debug!(
            path = %path.as_ref().display(),
            entities = mappings.len(),
            "Loaded field map"
        );
        Ok(FieldMapConfig { mappings })
    }

    /// 转换为只读的字段映射表
    pub fn into_table(self) -> FieldMapTable {
        FieldMapTable::new(self.mappings)
    }
}

/// 从JSON文件加载服务端返回的实体列表
///
/// 字段名会通过 `field_map` 转换为用户侧名称。
pub fn load_schemas<P: AsRef<Path>>(
    path: P,
    field_map: &FieldMapTable,
) -> Result<SchemaRegistry, ConfigError> {
    let content = read_config(path.as_ref())?;

    let registry =
        SchemaRegistry::from_json_str(&content, field_map).map_err(|source| ConfigError::Json {
            path: path.as_ref().display().to_string(),
            source,
        })?;

    tracing::debug!(
        path = %path.as_ref().display(),
        entities = registry.len(),
        "Loaded entity schemas"
    );
    Ok(registry)
}

/// 读取配置文件内容
fn read_config(path: &Path) -> Result<String, ConfigError> {
    // 检查文件是否存在
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
