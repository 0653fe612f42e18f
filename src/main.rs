use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use strack_query::config::{load_schemas, FieldMapConfig};
use strack_query::{
    parse_filter_expression, Command, EntitySchema, FieldMapTable, QueryFormatter, SchemaRegistry,
};

const FIELD_MAP_FILE: &str = "field_map.json";
const ENTITIES_FILE: &str = "entities.json";
const ENV_LOG: &str = "STRACK_LOG";

const HELP: &str = "\
:entity <name>    切换当前实体
:fields a,b.c     设置查询字段 (不带参数则清空)
:entities         列出已知实体
:help             显示帮助
:quit             退出
其他输入按过滤表达式编译, 例如: name = layout and (id > 3 or status.name like wip)";

fn init_logging() {
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .with_env_filter(filter)
        .init();
}

/// 加载字段映射，优先使用JSON配置，失败时使用内置映射
fn load_field_map() -> FieldMapTable {
    match FieldMapConfig::from_json_file(FIELD_MAP_FILE) {
        Ok(config) => {
            println!("✅ 成功从 {} 加载字段映射", FIELD_MAP_FILE);
            config.into_table()
        }
        Err(e) => {
            println!("⚠️ 无法加载字段映射 ({}), 使用内置映射", e);
            FieldMapTable::builtin().clone()
        }
    }
}

/// 加载实体 schema，失败时使用演示用的默认 schema
fn load_registry(field_map: &FieldMapTable) -> SchemaRegistry {
    match load_schemas(ENTITIES_FILE, field_map) {
        Ok(registry) => {
            println!("✅ 成功从 {} 加载 {} 个实体", ENTITIES_FILE, registry.len());
            registry
        }
        Err(e) => {
            println!("⚠️ 无法加载实体列表 ({}), 使用默认配置", e);
            default_registry()
        }
    }
}

fn default_registry() -> SchemaRegistry {
    [
        EntitySchema::new("task", "task_id")
            .with_fields(["id", "name", "due_date", "project_id", "step_id", "assignee"])
            .with_relations(["status", "department", "project"]),
        EntitySchema::new("user", "user_id")
            .with_fields(["id", "name", "login", "email", "status"])
            .with_relations(["department", "avatar"]),
        EntitySchema::new("department", "dept_id").with_fields(["id", "name"]),
        EntitySchema::new("status", "status_id").with_fields(["id", "name", "icon", "color"]),
        EntitySchema::new("project", "p_id")
            .with_fields(["id", "name", "status", "sub_date", "due_date", "description"]),
    ]
    .into_iter()
    .collect()
}

struct Session {
    entity: String,
    fields: Option<Vec<String>>,
}

fn compile(line: &str, session: &Session, formatter: &QueryFormatter<'_>, registry: &SchemaRegistry) {
    let Some(schema) = registry.get(&session.entity) else {
        println!("✗ 未知实体: {}", session.entity);
        return;
    };

    match parse_filter_expression(line) {
        Ok(Some(tree)) => println!("AST 结构: {:#?}", tree),
        Ok(None) => println!("(空表达式)"),
        Err(e) => {
            println!("✗ 解析失败: {}", e);
            return;
        }
    }

    let command = Command::Query {
        filters: Some(line.to_string()),
        fields: session.fields.clone(),
    };
    match command.build(formatter, schema) {
        Ok(payload) => {
            for (key, value) in &payload.form {
                println!("{} = {}", key, value);
            }
        }
        Err(e) => println!("✗ 编译失败: {}", e),
    }
}

fn run(formatter: &QueryFormatter<'_>, registry: &SchemaRegistry) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut session = Session {
        entity: "task".to_string(),
        fields: None,
    };

    loop {
        let line = match editor.readline(&format!("{}> ", session.entity)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(line)?;

        let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            ":quit" | ":q" => break,
            ":help" => println!("{}", HELP),
            ":entities" => {
                let mut names: Vec<_> = registry.names().collect();
                names.sort_unstable();
                println!("{}", names.join(", "));
            }
            ":entity" => {
                let name = argument.trim();
                if registry.get(name).is_some() {
                    session.entity = name.to_string();
                } else {
                    println!("✗ 未知实体: {}", name);
                }
            }
            ":fields" => {
                let fields: Vec<String> = argument
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(String::from)
                    .collect();
                session.fields = if fields.is_empty() { None } else { Some(fields) };
            }
            _ => compile(line, &session, formatter, registry),
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    println!("--- Strack Query: 过滤表达式编译器 ---");

    let field_map = load_field_map();
    let registry = load_registry(&field_map);
    let formatter = QueryFormatter::new(&field_map).with_schemas(&registry);

    println!("输入 :help 查看命令\n");
    run(&formatter, &registry)
}
