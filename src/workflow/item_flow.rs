//! 条目处理流程 - 流程层
//!
//! 核心职责：定义"一个条目"的完整处理流程
//!
//! 流程顺序：
//! 1. 没有旧格式文档 → skipped
//! 2. 双路渲染（转换失败 → conversion_error）
//! 3. 规范化比较 → match / mismatch
//!
//! 条目边界：除致命错误外，任何错误（包括 panic）都只让当前条目变成
//! conversion_error，批处理继续。
//!
//! 终态不是 mismatch 时删除该条目以前留下的产物。

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error};

use crate::error::AppResult;
use crate::models::{ContentItem, ItemStatus};
use crate::services::{Comparator, DualRenderer, RenderOutcome};
use crate::workflow::item_ctx::ItemCtx;

/// 条目处理流程
///
/// - 编排单个条目的完整处理流程
/// - 决定何时跳过、何时比较
/// - 只依赖业务能力（services）
pub struct ItemFlow {
    renderer: DualRenderer,
    comparator: Comparator,
}

impl ItemFlow {
    /// 创建新的条目处理流程
    pub fn new(renderer: DualRenderer, comparator: Comparator) -> Self {
        Self {
            renderer,
            comparator,
        }
    }

    /// 处理单个条目，返回终态
    ///
    /// 只有致命错误会以 `Err` 返回，调用方应据此终止整批处理。
    pub async fn run(&self, item: &mut ContentItem, ctx: &ItemCtx) -> AppResult<ItemStatus> {
        let status = self.resolve(item, ctx).await?;

        if status != ItemStatus::Mismatch {
            self.comparator.discard_artifacts(&item.id).await;
        }

        Ok(status)
    }

    async fn resolve(&self, item: &mut ContentItem, ctx: &ItemCtx) -> AppResult<ItemStatus> {
        if !item.has_legacy_document() {
            debug!("{} 没有旧格式文档，跳过", ctx);
            item.settle(ItemStatus::Skipped)?;
            return Ok(ItemStatus::Skipped);
        }

        let result = AssertUnwindSafe(self.process(item, ctx)).catch_unwind().await;

        let reason = match result {
            Ok(Ok(status)) => return Ok(status),
            Ok(Err(e)) if e.is_fatal() => return Err(e),
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(&*panic),
        };

        error!("{} ❌ 处理失败: {}", ctx, reason);
        if !item.status().is_terminal() {
            item.fail_conversion(reason)?;
        }

        Ok(item.status())
    }

    async fn process(&self, item: &mut ContentItem, ctx: &ItemCtx) -> AppResult<ItemStatus> {
        match self.renderer.render(item).await? {
            RenderOutcome::ConversionFailed => Ok(ItemStatus::ConversionError),
            RenderOutcome::Rendered => {
                let matched = self.comparator.compare(item).await?;
                debug!("{} 比较完成: {}", ctx, if matched { "一致" } else { "不一致" });
                Ok(item.status())
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}
