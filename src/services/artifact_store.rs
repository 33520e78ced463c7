//! 失败产物写入服务 - 业务能力层
//!
//! 只负责"把不匹配条目的规范化 HTML 和文档 JSON 写到磁盘"，不关心流程。
//!
//! 目录布局：`<root>/<id>/{mobiledoc.html, lexical.html, mobiledoc.json, lexical.json}`

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value as JsonValue;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, FileError};

pub const LEGACY_HTML_FILE: &str = "mobiledoc.html";
pub const CONVERTED_HTML_FILE: &str = "lexical.html";
pub const LEGACY_JSON_FILE: &str = "mobiledoc.json";
pub const CONVERTED_JSON_FILE: &str = "lexical.json";

/// 目录名中原样保留 `[A-Za-z0-9._-]`，其余字节（包括 `%` 本身）百分号编码
const DIR_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// 一个不匹配条目的全部产物
#[derive(Debug, Clone, Copy)]
pub struct ArtifactSet<'a> {
    /// 规范化后的旧格式 HTML
    pub legacy_html: &'a str,
    /// 规范化后的新格式 HTML
    pub converted_html: &'a str,
    /// 序列化的旧格式文档
    pub legacy_document: Option<&'a str>,
    pub converted_document: Option<&'a JsonValue>,
}

/// 失败产物写入服务
///
/// 目录只属于当前状态为 mismatch 的条目：不匹配时 `persist`，其余终态 `clear`。
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 条目对应的产物目录
    ///
    /// 不同的 id 总是映射到不同的目录。
    pub fn item_dir(&self, id: &str) -> PathBuf {
        self.root.join(dir_name(id))
    }

    /// 写入产物
    ///
    /// 每次都重建目录，旧的产物会被替换。写入中途失败时删除整个目录，
    /// 不留下不完整的产物。
    ///
    /// # 返回
    /// 产物目录
    pub async fn persist(&self, id: &str, artifacts: &ArtifactSet<'_>) -> AppResult<PathBuf> {
        let dir = self.item_dir(id);

        if let Err(e) = write_artifacts(&dir, artifacts).await {
            if let Err(cleanup) = remove_dir_if_exists(&dir).await {
                warn!("⚠️  不完整的产物目录清理失败: {}", cleanup);
            }
            return Err(e);
        }

        debug!("已写入产物: {}", dir.display());
        Ok(dir)
    }

    /// 删除条目的产物目录（不存在时什么都不做）
    ///
    /// 失败只记录警告。
    pub async fn clear(&self, id: &str) {
        let dir = self.item_dir(id);
        match remove_dir_if_exists(&dir).await {
            Ok(true) => debug!("已删除过期产物: {}", dir.display()),
            Ok(false) => {}
            Err(e) => warn!("⚠️  条目 {} 的过期产物删除失败: {}", id, e),
        }
    }
}

fn dir_name(id: &str) -> String {
    // 编码结果里的 `%` 后面总有两位十六进制，单独的 `%` 不会重复
    if id.is_empty() {
        return "%".to_string();
    }
    // `.` 和 `..` 不能当目录名
    if id.bytes().all(|b| b == b'.') {
        return "%2E".repeat(id.len());
    }
    utf8_percent_encode(id, DIR_NAME).to_string()
}

async fn write_artifacts(dir: &Path, artifacts: &ArtifactSet<'_>) -> AppResult<()> {
    remove_dir_if_exists(dir).await?;
    fs::create_dir_all(dir).await.map_err(|source| FileError::CreateDirFailed {
        path: dir.display().to_string(),
        source,
    })?;

    let legacy_json = artifacts
        .legacy_document
        .map(pretty_document)
        .unwrap_or_else(|| "null".to_string());
    let converted_json = match artifacts.converted_document {
        Some(document) => serde_json::to_string_pretty(document).map_err(|source| {
            FileError::JsonFailed {
                path: dir.join(CONVERTED_JSON_FILE).display().to_string(),
                source,
            }
        })?,
        None => "null".to_string(),
    };

    write_file(&dir.join(LEGACY_HTML_FILE), artifacts.legacy_html).await?;
    write_file(&dir.join(CONVERTED_HTML_FILE), artifacts.converted_html).await?;
    write_file(&dir.join(LEGACY_JSON_FILE), &legacy_json).await?;
    write_file(&dir.join(CONVERTED_JSON_FILE), &converted_json).await?;

    Ok(())
}

/// 删除目录，返回是否确实删除了
async fn remove_dir_if_exists(dir: &Path) -> AppResult<bool> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::file_write_failed(dir.display().to_string(), e)),
    }
}

/// 序列化文档重新排版为两格缩进，无法解析时原样保留
fn pretty_document(raw: &str) -> String {
    serde_json::from_str::<JsonValue>(raw)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| raw.to_string())
}

async fn write_file(path: &Path, content: &str) -> AppResult<()> {
    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}
