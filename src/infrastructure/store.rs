//! 语料源与结果回写 - 基础设施层
//!
//! 批处理只通过这两个接口访问语料库：
//! - `CorpusSource`：按顺序（或随机顺序）读取条目，惰性、有限
//! - `ResultSink`：回写每个条目的终态和渲染结果

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{load_corpus_file, CorpusEntry, ItemStatus};

/// 语料源
pub trait CorpusSource: Send + Sync {
    /// 按存储顺序读取全部条目
    fn fetch_all(&self) -> BoxStream<'_, AppResult<CorpusEntry>>;

    /// 随机顺序读取全部条目
    fn fetch_random_order(&self) -> BoxStream<'_, AppResult<CorpusEntry>>;
}

/// 单条回写记录
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord<'a> {
    pub status: ItemStatus,
    pub legacy_html: Option<&'a str>,
    pub converted_html: Option<&'a str>,
}

/// 结果回写
pub trait ResultSink: Send + Sync {
    fn update_status<'a>(
        &'a self,
        id: &'a str,
        record: StatusRecord<'a>,
    ) -> BoxFuture<'a, AppResult<()>>;
}

/// 基于导出文件的语料库
#[derive(Debug, Clone, Default)]
pub struct JsonCorpusStore {
    entries: Vec<CorpusEntry>,
}

impl JsonCorpusStore {
    /// 加载导出文件
    pub async fn open(path: &Path) -> AppResult<Self> {
        let entries = load_corpus_file(path).await?;
        Ok(Self { entries })
    }

    /// 直接使用内存中的条目
    pub fn from_entries(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CorpusSource for JsonCorpusStore {
    fn fetch_all(&self) -> BoxStream<'_, AppResult<CorpusEntry>> {
        stream::iter(self.entries.iter().cloned().map(Ok)).boxed()
    }

    fn fetch_random_order(&self) -> BoxStream<'_, AppResult<CorpusEntry>> {
        let mut entries = self.entries.clone();
        entries.shuffle(&mut rand::rng());
        stream::iter(entries.into_iter().map(Ok)).boxed()
    }
}

/// 以 JSON Lines 追加写入的结果回写
///
/// 每行一条记录，后写入的记录覆盖同一 id 之前的记录。
#[derive(Debug, Clone)]
pub struct JsonlResultSink {
    path: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusLine<'a> {
    id: &'a str,
    #[serde(flatten)]
    record: StatusRecord<'a>,
    updated_at: String,
}

impl JsonlResultSink {
    /// 创建回写文件（以及父目录）
    ///
    /// 文件无法打开时视为存储不可达。
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::store_unreachable(parent.display().to_string(), e))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::store_unreachable(path.display().to_string(), e))?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, id: &str, record: StatusRecord<'_>) -> AppResult<()> {
        let line = StatusLine {
            id,
            record,
            updated_at: chrono::Local::now().to_rfc3339(),
        };
        let mut json = serde_json::to_string(&line)
            .map_err(|e| AppError::store_write_failed(self.path.display().to_string(), e))?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::store_unreachable(self.path.display().to_string(), e))?;

        file.write_all(json.as_bytes())
            .await
            .map_err(|e| AppError::store_write_failed(self.path.display().to_string(), e))?;

        debug!("已回写状态: {} -> {}", id, record.status);
        Ok(())
    }
}

impl ResultSink for JsonlResultSink {
    fn update_status<'a>(
        &'a self,
        id: &'a str,
        record: StatusRecord<'a>,
    ) -> BoxFuture<'a, AppResult<()>> {
        self.append(id, record).boxed()
    }
}
