//! 语料导出文件加载
//!
//! 支持三种形状：
//! - CMS 导出：`{"db": [{"data": {"posts": [...]}}]}`
//! - 精简导出：`{"data": {"posts": [...]}}`
//! - 条目数组：`[{"id": ..., "legacyDocument": ...}]`

use crate::error::{AppError, AppResult, StoreError};
use crate::models::CorpusEntry;
use serde_json::Value as JsonValue;
use std::path::Path;
use tokio::fs;

/// 从导出文件加载全部语料条目
pub async fn load_corpus_file(path: &Path) -> AppResult<Vec<CorpusEntry>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::store_unreachable(path.display().to_string(), e))?;

    let entries = parse_corpus_export(&content).map_err(|message| {
        AppError::Store(StoreError::MalformedCorpus {
            path: path.display().to_string(),
            message,
        })
    })?;

    tracing::info!("从 {} 加载了 {} 个条目", path.display(), entries.len());

    Ok(entries)
}

/// 解析导出文件内容
pub fn parse_corpus_export(content: &str) -> Result<Vec<CorpusEntry>, String> {
    let root: JsonValue = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let posts = find_posts(&root).ok_or_else(|| "找不到 posts 数组".to_string())?;

    let mut entries = Vec::with_capacity(posts.len());
    for (index, post) in posts.iter().enumerate() {
        match parse_post(post) {
            Some(entry) => entries.push(entry),
            None => tracing::warn!("第 {} 个条目缺少 id，已忽略", index + 1),
        }
    }

    Ok(entries)
}

fn find_posts(root: &JsonValue) -> Option<&Vec<JsonValue>> {
    if let Some(array) = root.as_array() {
        return Some(array);
    }

    if let Some(posts) = root.pointer("/data/posts").and_then(|v| v.as_array()) {
        return Some(posts);
    }

    root.get("db")
        .and_then(|db| db.as_array())
        .and_then(|dbs| dbs.first())
        .and_then(|db| db.pointer("/data/posts"))
        .and_then(|v| v.as_array())
}

fn parse_post(post: &JsonValue) -> Option<CorpusEntry> {
    let id = ["uuid", "id"]
        .iter()
        .find_map(|key| match post.get(*key) {
            Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            _ => None,
        })?;

    let document = ["mobiledoc", "legacyDocument"]
        .iter()
        .find_map(|key| post.get(*key))
        .and_then(|value| match value {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            // 部分导出把文档存成对象而不是字符串
            other => Some(other.to_string()),
        });

    Some(CorpusEntry::new(id, document))
}
