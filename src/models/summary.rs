//! 运行统计

use serde::Serialize;

use crate::models::ItemStatus;

/// 运行统计
///
/// 运行开始时清零，每处理一个条目更新一次，运行结束后只读。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub conversion_errors: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// 记录一个已确定终态的条目
    pub fn record(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Match => self.matched += 1,
            ItemStatus::Mismatch => self.mismatched += 1,
            ItemStatus::ConversionError => self.conversion_errors += 1,
            ItemStatus::Skipped => self.skipped += 1,
            // 未完成的条目不计数
            ItemStatus::Pending => return,
        }
        self.total += 1;
    }

    /// 失败数量（不匹配 + 转换失败）
    pub fn failures(&self) -> usize {
        self.mismatched + self.conversion_errors
    }

    /// 成功率 = matched / (total - skipped)
    ///
    /// 分母为 0 时返回 `None`。
    pub fn success_rate(&self) -> Option<f64> {
        let denominator = self.total - self.skipped;
        if denominator == 0 {
            None
        } else {
            Some(self.matched as f64 / denominator as f64)
        }
    }

    /// 成功率的百分比文本
    pub fn success_rate_display(&self) -> String {
        match self.success_rate() {
            Some(rate) => format!("{:.2}%", rate * 100.0),
            None => "n/a".to_string(),
        }
    }
}

/// 运行结束时的状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// 语料全部处理完
    Complete,
    /// 收到外部取消信号，在条目之间停止
    Cancelled,
    /// 存储不可达或语料损坏
    Aborted { reason: String },
}

/// 批处理结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub summary: RunSummary,
    #[serde(flatten)]
    pub state: RunState,
}
