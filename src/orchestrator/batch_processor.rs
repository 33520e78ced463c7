//! 批量条目处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责整批语料的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：加载规范化选项、语料库、回写文件，构建渲染器
//! 2. **顺序处理**：严格按语料顺序逐条处理，输出顺序与语料一致
//! 3. **条目隔离**：单个条目失败不影响其余条目
//! 4. **状态回写**：每个条目完成后回写终态
//! 5. **取消**：只在条目之间检查取消信号
//! 6. **全局统计**：汇总 RunSummary，输出并持久化
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个条目的细节，委托 `ItemFlow`
//! - **唯一写者**：只有这里修改 RunSummary

use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{
    CommandRenderer, CorpusSource, JsonCorpusStore, JsonlResultSink, ResultSink, StatusRecord,
};
use crate::models::{load_options_file, ContentItem, ItemStatus, RunOutcome, RunState, RunSummary};
use crate::services::{ArtifactStore, Canonicalizer, Comparator, DiffWriter, DualRenderer};
use crate::utils::truncate_text;
use crate::workflow::{ItemCtx, ItemFlow};

/// 批处理参数
#[derive(Clone, Copy)]
pub struct BatchOptions<'a> {
    /// 是否随机顺序处理
    pub random_order: bool,
    /// 结果回写（可选）
    pub sink: Option<&'a dyn ResultSink>,
    /// 取消标志，在每个条目开始前检查
    pub cancel: &'a AtomicBool,
}

/// 处理整批语料
///
/// 严格顺序执行：上一个条目（包括回写）完成后才开始下一个。
///
/// 终止条件：
/// - 语料读完 → `Complete`
/// - 取消标志被设置 → `Cancelled`
/// - 语料读取失败、旧格式渲染失败、回写存储不可达 → `Aborted`
///
/// 任何情况下返回的统计都只包含已完成的条目。
pub async fn run_batch(
    corpus: &dyn CorpusSource,
    flow: &ItemFlow,
    options: BatchOptions<'_>,
) -> RunOutcome {
    let mut summary = RunSummary::default();
    let mut entries = if options.random_order {
        corpus.fetch_random_order()
    } else {
        corpus.fetch_all()
    };
    let mut index = 0;

    loop {
        if options.cancel.load(Ordering::SeqCst) {
            warn!("🛑 收到取消信号，已处理 {} 个条目后停止", summary.total);
            return RunOutcome {
                summary,
                state: RunState::Cancelled,
            };
        }

        let entry = match entries.next().await {
            None => break,
            Some(Ok(entry)) => entry,
            Some(Err(e)) => {
                error!("❌ 读取语料失败: {}", e);
                return aborted(summary, &e);
            }
        };

        index += 1;
        let ctx = ItemCtx::new(entry.id.clone(), index);
        let mut item = ContentItem::from(entry);

        let status = match flow.run(&mut item, &ctx).await {
            Ok(status) => status,
            Err(e) => {
                error!("{} ❌ 致命错误，终止本次运行: {}", ctx, e);
                return aborted(summary, &e);
            }
        };

        summary.record(status);
        log_item_result(&item, status);
        log_progress(&summary);

        if let Some(sink) = options.sink {
            let record = StatusRecord {
                status,
                legacy_html: item.legacy_html.as_deref(),
                converted_html: item.converted_html.as_deref(),
            };
            if let Err(e) = sink.update_status(&item.id, record).await {
                if e.is_fatal() {
                    error!("{} ❌ 回写存储不可达，终止本次运行: {}", ctx, e);
                    return aborted(summary, &e);
                }
                warn!("{} ⚠️  状态回写失败: {}", ctx, e);
            }
        }
    }

    RunOutcome {
        summary,
        state: RunState::Complete,
    }
}

fn aborted(summary: RunSummary, error: &AppError) -> RunOutcome {
    RunOutcome {
        summary,
        state: RunState::Aborted {
            reason: error.to_string(),
        },
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    corpus: JsonCorpusStore,
    sink: Option<JsonlResultSink>,
    flow: ItemFlow,
    cancel: Arc<AtomicBool>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        // 规范化选项
        let options = load_options_file(Path::new(&config.options_file)).await?;

        // 外部渲染命令
        let legacy = Config::require_command("LEGACY_RENDER_CMD", &config.legacy_render_cmd)?;
        let converter = Config::require_command("CONVERT_CMD", &config.convert_cmd)?;
        let renderer = Config::require_command("NEW_RENDER_CMD", &config.new_render_cmd)?;
        let dual_renderer = DualRenderer::new(
            CommandRenderer::new(legacy),
            CommandRenderer::new(converter),
            CommandRenderer::new(renderer),
        );

        let mut comparator = Comparator::new(
            Canonicalizer::new(options),
            ArtifactStore::new(&config.results_dir),
        );
        if config.write_diffs {
            comparator = comparator.with_diffs(DiffWriter::new(&config.diffs_dir));
        }

        // 语料库
        info!("\n📁 正在加载语料: {}", config.corpus_file);
        let corpus = JsonCorpusStore::open(Path::new(&config.corpus_file))
            .await
            .with_context(|| format!("无法加载语料文件: {}", config.corpus_file))?;

        // 状态回写
        let sink = if config.write_back {
            let sink = JsonlResultSink::open(&config.status_file)
                .await
                .with_context(|| format!("无法打开状态回写文件: {}", config.status_file))?;
            Some(sink)
        } else {
            None
        };

        Ok(Self {
            config,
            corpus,
            sink,
            flow: ItemFlow::new(dual_renderer, comparator),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 取消标志，设置后在下一个条目开始前停止
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunOutcome> {
        if self.corpus.is_empty() {
            warn!("⚠️ 语料中没有条目，程序结束");
        } else {
            log_corpus_loaded(self.corpus.len(), self.config.random_order);
        }

        let outcome = run_batch(
            &self.corpus,
            &self.flow,
            BatchOptions {
                random_order: self.config.random_order,
                sink: self.sink.as_ref().map(|sink| sink as &dyn ResultSink),
                cancel: &self.cancel,
            },
        )
        .await;

        // 输出最终统计
        print_final_stats(&outcome, &self.config);

        if let Err(e) = write_summary(Path::new(&self.config.summary_file), &outcome).await {
            warn!("⚠️ 运行汇总写入失败: {:#}", e);
        }

        Ok(outcome)
    }
}

/// 持久化的运行汇总
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryReport<'a> {
    #[serde(flatten)]
    outcome: &'a RunOutcome,
    failures: usize,
    success_rate: Option<f64>,
    finished_at: String,
}

async fn write_summary(path: &Path, outcome: &RunOutcome) -> Result<()> {
    let report = SummaryReport {
        outcome,
        failures: outcome.summary.failures(),
        success_rate: outcome.summary.success_rate(),
        finished_at: chrono::Local::now().to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建目录: {}", parent.display()))?;
    }
    fs::write(path, json)
        .await
        .with_context(|| format!("无法写入文件: {}", path.display()))?;

    Ok(())
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 渲染一致性校验");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📂 产物目录: {}", config.results_dir);
    info!("{}", "=".repeat(60));
}

fn log_corpus_loaded(total: usize, random_order: bool) {
    info!("✓ 找到 {} 个待处理的条目", total);
    if random_order {
        info!("🎲 随机顺序处理\n");
    } else {
        info!("📋 按语料顺序逐条处理\n");
    }
}

fn log_item_result(item: &ContentItem, status: ItemStatus) {
    match status {
        ItemStatus::Match => info!("{}: ✅", item.id),
        ItemStatus::Skipped => info!("{}: ⏭️  (skipped)", item.id),
        ItemStatus::ConversionError => info!(
            "{}: ❌ ({})",
            item.id,
            truncate_text(item.error.as_deref().unwrap_or("conversion_error"), 80)
        ),
        _ => info!("{}: ❌", item.id),
    }
}

fn log_progress(summary: &RunSummary) {
    info!("Success Rate: {}", summary.success_rate_display());
}

fn print_final_stats(outcome: &RunOutcome, config: &Config) {
    let summary = &outcome.summary;

    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("Total: {}", summary.total);
    info!("Failures: {}", summary.failures());
    info!("Success Rate: {}", summary.success_rate_display());
    info!("{}", "─".repeat(60));
    info!(
        "✅ 一致: {}  ❌ 不一致: {}  ⚠️ 转换失败: {}  ⏭️ 跳过: {}",
        summary.matched, summary.mismatched, summary.conversion_errors, summary.skipped
    );
    match &outcome.state {
        RunState::Complete => {}
        RunState::Cancelled => warn!("🛑 运行被取消，以上为部分结果"),
        RunState::Aborted { reason } => error!("❌ 运行中止: {}", reason),
    }
    info!("{}", "=".repeat(60));
    info!("\n不一致条目的产物已保存至: {}", config.results_dir);
}
