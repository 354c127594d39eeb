//! database_search 工具：SQLite 关键词检索
//!
//! 表结构 `documents(id, text, keywords)`，keywords 为逗号分隔的小写关键词；
//! 任一关键词命中 keywords 或 text 即返回该行，每行一个 Document。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};

use crate::memory::Document;
use crate::tools::{Tool, ToolInput, ToolKind};

const MAX_HITS: usize = 20;

/// 一条检索命中
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
    pub id: i64,
    pub text: String,
    pub keywords: String,
}

pub struct KeywordStore {
    conn: Connection,
}

impl KeywordStore {
    /// 打开（或创建）数据库并初始化表
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                keywords TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// 只打开已存在的数据库，路径错误时返回错误而不是新建空库
    pub fn open_existing(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn insert(&self, text: &str, keywords: &[&str]) -> rusqlite::Result<i64> {
        let keywords = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        self.conn.execute(
            "INSERT INTO documents (text, keywords) VALUES (?1, ?2)",
            params![text, keywords],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn search(&self, keywords: &[String]) -> rusqlite::Result<Vec<KeywordHit>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        // 每个关键词占一个参数，同时匹配 keywords 与 text 两列
        let clauses = (1..=keywords.len())
            .map(|i| format!("(lower(keywords) LIKE ?{i} OR lower(text) LIKE ?{i})"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT id, text, keywords FROM documents WHERE {} ORDER BY id LIMIT {}",
            clauses, MAX_HITS
        );
        let patterns = keywords.iter().map(|k| format!("%{}%", k.to_lowercase()));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(patterns), |row| {
            Ok(KeywordHit {
                id: row.get(0)?,
                text: row.get(1)?,
                keywords: row.get(2)?,
            })
        })?;
        rows.collect()
    }
}

pub struct DatabaseSearchTool {
    path: PathBuf,
}

impl DatabaseSearchTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(message: String, conversation_id: &str) -> Document {
        Document::error(message, conversation_id)
            .source("DatabaseTool")
            .description("Database search error")
            .build()
    }
}

#[async_trait]
impl Tool for DatabaseSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DatabaseSearch
    }

    async fn execute(&self, input: ToolInput<'_>) -> Vec<Document> {
        let conversation_id = input.conversation_id;
        if !input.parameters.get("keywords").is_some_and(|v| v.is_array()) {
            return vec![Self::error(
                format!("Invalid parameters: keywords must be an array, current parameters: {}", input.parameters),
                conversation_id,
            )];
        }
        let keywords = input.list_param("keywords");
        if keywords.is_empty() {
            return vec![Self::error("No keywords provided".to_string(), conversation_id)];
        }
        tracing::info!(keywords = ?keywords, "database_search tool execute");

        let path = self.path.clone();
        let query = keywords.clone();
        let result = tokio::task::spawn_blocking(move || KeywordStore::open_existing(&path)?.search(&query)).await;

        match result {
            Ok(Ok(hits)) if hits.is_empty() => vec![Document::new(
                format!("No documents found for keywords: {}", keywords.join(", ")),
                conversation_id,
            )
            .name("database_search_empty")
            .source("DatabaseTool")
            .description("Empty search result")
            .build()],
            Ok(Ok(hits)) => hits
                .into_iter()
                .map(|hit| {
                    Document::new(hit.text, conversation_id)
                        .name(format!("database_document_{}", hit.id))
                        .source(self.path.display().to_string())
                        .description(format!("Database document with keywords: {}", hit.keywords))
                        .build()
                })
                .collect(),
            Ok(Err(e)) => vec![Self::error(format!("Database error: {}", e), conversation_id)],
            Err(e) => vec![Self::error(format!("Database task failed: {}", e), conversation_id)],
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn seeded() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.db");
        let store = KeywordStore::open(&path).unwrap();
        store.insert("Rafal was seen in Lubawa", &["Rafal", "Lubawa"]).unwrap();
        store.insert("Barbara teaches in Krakow", &["barbara", "krakow"]).unwrap();
        store.insert("Unrelated note", &["misc"]).unwrap();
        (dir, path)
    }

    #[test]
    fn test_search_matches_keywords_and_text() {
        let (_dir, path) = seeded();
        let store = KeywordStore::open(&path).unwrap();
        let hits = store.search(&["lubawa".to_string()]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].keywords, "rafal,lubawa");

        let hits = store.search(&["TEACHES".to_string(), "misc".to_string()]).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(store.search(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tool_returns_document_per_hit() {
        let (_dir, path) = seeded();
        let tool = DatabaseSearchTool::new(&path);
        let params = json!({ "keywords": ["rafal", "barbara"] });
        let docs = tool
            .execute(ToolInput { parameters: &params, context: &[], conversation_id: "c" })
            .await;
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| !d.is_error()));
        assert_eq!(docs[0].text, "Rafal was seen in Lubawa");
    }

    #[tokio::test]
    async fn test_tool_validates_keywords() {
        let (_dir, path) = seeded();
        let tool = DatabaseSearchTool::new(&path);
        for params in [json!({ "keywords": "rafal" }), json!({ "keywords": [] }), json!({})] {
            let docs = tool
                .execute(ToolInput { parameters: &params, context: &[], conversation_id: "c" })
                .await;
            assert_eq!(docs.len(), 1);
            assert!(docs[0].is_error());
        }
    }

    #[tokio::test]
    async fn test_missing_database_is_error_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let tool = DatabaseSearchTool::new(&path);
        let params = json!({ "keywords": ["rafal"] });
        let docs = tool
            .execute(ToolInput { parameters: &params, context: &[], conversation_id: "c" })
            .await;
        assert_eq!(docs.len(), 1);
        assert!(docs[0].is_error());
        assert!(docs[0].text.starts_with("Database error"));
        assert!(!path.exists());
    }
}
