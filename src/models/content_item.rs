//! 内容条目 - 批处理的最小工作单元

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{AppResult, BusinessError};

/// 条目状态
///
/// `Pending` 之外的状态都是终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Match,
    Mismatch,
    ConversionError,
    Skipped,
}

impl ItemStatus {
    /// 获取标准名称
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Match => "match",
            ItemStatus::Mismatch => "mismatch",
            ItemStatus::ConversionError => "conversion_error",
            ItemStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != ItemStatus::Pending
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 语料源返回的原始条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusEntry {
    pub id: String,
    /// 序列化后的旧格式文档，可能为空
    pub legacy_document: Option<String>,
}

impl CorpusEntry {
    pub fn new(id: impl Into<String>, legacy_document: Option<String>) -> Self {
        Self {
            id: id.into(),
            legacy_document,
        }
    }
}

/// 内容条目
///
/// 渲染结果只在本次运行中存在；规范化后的 HTML 不回写到这里。
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub id: String,
    pub legacy_document: Option<String>,
    pub converted_document: Option<JsonValue>,
    pub legacy_html: Option<String>,
    pub converted_html: Option<String>,
    /// 转换失败原因（仅 conversion_error）
    pub error: Option<String>,
    status: ItemStatus,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, legacy_document: Option<String>) -> Self {
        Self {
            id: id.into(),
            legacy_document,
            converted_document: None,
            legacy_html: None,
            converted_html: None,
            error: None,
            status: ItemStatus::Pending,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// 旧格式文档为空（或只有空白）时跳过
    pub fn has_legacy_document(&self) -> bool {
        self.legacy_document
            .as_deref()
            .is_some_and(|doc| !doc.trim().is_empty() && doc.trim() != "null")
    }

    /// 确定条目终态
    ///
    /// 状态只能从 `Pending` 转换一次。
    pub fn settle(&mut self, status: ItemStatus) -> AppResult<()> {
        if self.status.is_terminal() || !status.is_terminal() {
            return Err(BusinessError::StatusAlreadySettled {
                id: self.id.clone(),
                from: self.status,
                to: status,
            }
            .into());
        }
        self.status = status;
        Ok(())
    }

    /// 以 conversion_error 结束，并记录原因
    pub fn fail_conversion(&mut self, reason: impl Into<String>) -> AppResult<()> {
        self.settle(ItemStatus::ConversionError)?;
        self.error = Some(reason.into());
        Ok(())
    }
}

impl From<CorpusEntry> for ContentItem {
    fn from(entry: CorpusEntry) -> Self {
        ContentItem::new(entry.id, entry.legacy_document)
    }
}
