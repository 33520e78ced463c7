//! 双路渲染服务 - 业务能力层
//!
//! 同一份旧格式文档走两条路径：
//! - 旧格式渲染器直接渲染
//! - 转换为新格式后由新格式渲染器渲染
//!
//! 结果写回 `ContentItem`，不做比较。

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, BusinessError};
use crate::infrastructure::{FormatConverter, LegacyRenderer, NewRenderer};
use crate::models::ContentItem;

/// 双路渲染结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// 两路 HTML 都已生成，可以比较
    Rendered,
    /// 转换失败，条目已标记为 conversion_error
    ConversionFailed,
}

/// 双路渲染服务
pub struct DualRenderer {
    legacy: Box<dyn LegacyRenderer>,
    converter: Box<dyn FormatConverter>,
    renderer: Box<dyn NewRenderer>,
}

impl DualRenderer {
    pub fn new(
        legacy: impl LegacyRenderer + 'static,
        converter: impl FormatConverter + 'static,
        renderer: impl NewRenderer + 'static,
    ) -> Self {
        Self {
            legacy: Box::new(legacy),
            converter: Box::new(converter),
            renderer: Box::new(renderer),
        }
    }

    /// 渲染单个条目
    ///
    /// # 返回
    /// - `Rendered`: `legacy_html` 与 `converted_html` 都已填充
    /// - `ConversionFailed`: 转换器报错，条目已是终态
    ///
    /// 旧格式文档无法解析、新格式渲染失败时返回非致命错误，
    /// 旧格式渲染失败时返回致命错误。
    pub async fn render(&self, item: &mut ContentItem) -> AppResult<RenderOutcome> {
        let raw = item
            .legacy_document
            .as_deref()
            .ok_or_else(|| BusinessError::MissingDocument { id: item.id.clone() })?;
        let document: JsonValue =
            serde_json::from_str(raw).map_err(|source| BusinessError::MalformedDocument {
                id: item.id.clone(),
                source,
            })?;

        let legacy_html = self
            .legacy
            .render(&document)
            .await
            .map_err(|e| AppError::legacy_render_failed(item.id.clone(), e))?;
        item.legacy_html = Some(legacy_html);

        let converted = match self.converter.convert(&document).await {
            Ok(converted) => converted,
            Err(e) => {
                warn!("⚠️  条目 {} 转换失败: {}", item.id, e.message);
                item.fail_conversion(e.message)?;
                return Ok(RenderOutcome::ConversionFailed);
            }
        };

        let converted: &JsonValue = item.converted_document.insert(converted);
        let converted_html = self
            .renderer
            .render(converted)
            .await
            .map_err(|e| AppError::new_render_failed(item.id.clone(), e))?;
        item.converted_html = Some(converted_html);

        debug!("条目 {} 双路渲染完成", item.id);
        Ok(RenderOutcome::Rendered)
    }
}
