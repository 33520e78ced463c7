//! 条目处理上下文
//!
//! 封装"我正在处理第几个条目、它的 id 是什么"这一信息

use std::fmt::Display;

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 条目ID
    pub id: String,

    /// 处理序号（从1开始，仅用于日志显示）
    pub index: usize,
}

impl ItemCtx {
    /// 创建新的条目上下文
    pub fn new(id: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            index,
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[条目 #{} ID#{}]", self.index, self.id)
    }
}
