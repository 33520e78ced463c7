//! 比较服务 - 业务能力层
//!
//! 规范化两路 HTML 并判定 match / mismatch；不匹配时写出产物以便排查。

use tracing::{debug, warn};

use crate::error::{AppResult, BusinessError};
use crate::models::{ContentItem, ItemStatus};
use crate::services::artifact_store::{
    ArtifactSet, ArtifactStore, CONVERTED_HTML_FILE, LEGACY_HTML_FILE,
};
use crate::services::canonicalizer::Canonicalizer;
use crate::services::diff_writer::DiffWriter;

/// 比较服务
#[derive(Debug, Clone)]
pub struct Comparator {
    canonicalizer: Canonicalizer,
    artifacts: ArtifactStore,
    diffs: Option<DiffWriter>,
}

impl Comparator {
    pub fn new(canonicalizer: Canonicalizer, artifacts: ArtifactStore) -> Self {
        Self {
            canonicalizer,
            artifacts,
            diffs: None,
        }
    }

    /// 不匹配时额外生成彩色 diff
    pub fn with_diffs(mut self, diffs: DiffWriter) -> Self {
        self.diffs = Some(diffs);
        self
    }

    /// 比较条目的两路渲染结果
    ///
    /// 原始 HTML 不会被修改，规范化结果只用于比较和产物。
    /// 产物写入失败只记录警告，不影响判定。
    ///
    /// # 返回
    /// 是否匹配
    pub async fn compare(&self, item: &mut ContentItem) -> AppResult<bool> {
        let (expected, actual) = match (item.legacy_html.as_deref(), item.converted_html.as_deref()) {
            (Some(legacy), Some(converted)) => (
                self.canonicalizer.canonicalize(legacy),
                self.canonicalizer.canonicalize(converted),
            ),
            _ => return Err(BusinessError::MissingRenderedHtml { id: item.id.clone() }.into()),
        };

        if expected == actual {
            item.settle(ItemStatus::Match)?;
            debug!("条目 {} 规范化后一致", item.id);
            return Ok(true);
        }

        item.settle(ItemStatus::Mismatch)?;

        let artifacts = ArtifactSet {
            legacy_html: &expected,
            converted_html: &actual,
            legacy_document: item.legacy_document.as_deref(),
            converted_document: item.converted_document.as_ref(),
        };
        let dir = match self.artifacts.persist(&item.id, &artifacts).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("⚠️  条目 {} 的产物写入失败: {}", item.id, e);
                return Ok(false);
            }
        };

        if let Some(diffs) = &self.diffs {
            let stem = self.diff_stem(&item.id);
            if let Err(e) = diffs
                .write(&stem, &dir.join(LEGACY_HTML_FILE), &dir.join(CONVERTED_HTML_FILE))
                .await
            {
                warn!("⚠️  条目 {} 的 diff 生成失败: {}", item.id, e);
            }
        }

        Ok(false)
    }

    /// 删除条目上一次不匹配时留下的产物和 diff
    ///
    /// 条目本次的终态不是 mismatch 时调用，失败只记录警告。
    pub async fn discard_artifacts(&self, id: &str) {
        self.artifacts.clear(id).await;

        if let Some(diffs) = &self.diffs {
            if let Err(e) = diffs.remove(&self.diff_stem(id)).await {
                warn!("⚠️  条目 {} 的过期 diff 删除失败: {}", id, e);
            }
        }
    }

    fn diff_stem(&self, id: &str) -> String {
        self.artifacts
            .item_dir(id)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| id.to_string())
    }
}
