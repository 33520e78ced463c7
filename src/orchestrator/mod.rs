//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整批处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量条目处理器
//! - 管理应用生命周期（初始化、运行）
//! - 从语料源逐条读取条目
//! - 委托 ItemFlow 处理单个条目
//! - 回写条目状态
//! - 输出并持久化全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理整批语料)
//!     ↓
//! workflow::ItemFlow (处理单个 ContentItem)
//!     ↓
//! services (能力层：dual_renderer / comparator / canonicalizer / artifact_store)
//!     ↓
//! infrastructure (基础设施：渲染器、语料源、结果回写)
//! ```
//!
//! ## 设计原则
//!
//! 1. **顺序执行**：条目按语料顺序逐个完成，进度输出顺序与语料一致
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;

// 重新导出主要类型
pub use batch_processor::{run_batch, App, BatchOptions};
