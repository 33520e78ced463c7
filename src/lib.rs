//! # Render Parity
//!
//! 校验文档从旧格式迁移到新格式后渲染结果是否一致的批处理工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 外部能力，只暴露接口
//! - `LegacyRenderer` / `FormatConverter` / `NewRenderer` - 渲染与转换
//! - `CorpusSource` / `ResultSink` - 语料读取与状态回写
//! - `CommandRenderer` - 通过外部命令实现渲染器
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 ContentItem
//! - `Canonicalizer` - HTML 规范化
//! - `DualRenderer` - 双路渲染
//! - `Comparator` - 比较并判定
//! - `ArtifactStore` - 写不匹配产物
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个条目"的完整处理流程
//! - `ItemCtx` - 上下文封装（id + 序号）
//! - `ItemFlow` - 流程编排（skip → render → compare）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 顺序处理整批语料，汇总统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, ConversionError};
pub use models::{ContentItem, ItemStatus, NormalizationOptions, RunOutcome, RunState, RunSummary};
pub use orchestrator::{run_batch, App, BatchOptions};
pub use services::{canonicalize, Canonicalizer};
pub use workflow::{ItemCtx, ItemFlow};
