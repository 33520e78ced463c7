use thiserror::Error;

use crate::models::ItemStatus;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 渲染相关错误
    #[error("渲染错误: {0}")]
    Render(#[from] RenderError),
    /// 语料库 / 结果存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 格式转换失败（条目级错误，不中断批处理）
#[derive(Debug, Clone, Error)]
#[error("格式转换失败: {message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 渲染相关错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 旧格式渲染器失败（语料损坏，整批终止）
    #[error("旧格式渲染失败 ({id}): {source}")]
    LegacyRenderFailed {
        id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 新格式渲染器失败
    #[error("新格式渲染失败 ({id}): {source}")]
    NewRenderFailed {
        id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 外部命令无法启动
    #[error("无法启动命令 `{command}`: {source}")]
    CommandSpawnFailed {
        command: String,
        source: std::io::Error,
    },
    /// 外部命令返回非零退出码
    #[error("命令 `{command}` 执行失败 (退出码: {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// 外部命令输出无法解析
    #[error("命令 `{command}` 输出无效: {message}")]
    InvalidOutput { command: String, message: String },
}

/// 语料库 / 结果存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 存储不可达（整批终止）
    #[error("存储不可达 ({target}): {source}")]
    Unreachable {
        target: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 语料导出文件格式错误
    #[error("语料文件格式错误 ({path}): {message}")]
    MalformedCorpus { path: String, message: String },
    /// 单条记录写入失败
    #[error("写入记录失败 ({target}): {source}")]
    WriteFailed {
        target: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON序列化失败 ({path}): {source}")]
    JsonFailed {
        path: String,
        source: serde_json::Error,
    },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 条目状态只能从 pending 转换一次
    #[error("条目 {id} 状态已确定为 {from}，不能再转换为 {to}")]
    StatusAlreadySettled {
        id: String,
        from: ItemStatus,
        to: ItemStatus,
    },
    /// 旧格式文档无法解析
    #[error("条目 {id} 的旧格式文档无法解析: {source}")]
    MalformedDocument {
        id: String,
        source: serde_json::Error,
    },
    /// 条目没有旧格式文档
    #[error("条目 {id} 没有旧格式文档")]
    MissingDocument { id: String },
    /// 比较前缺少渲染结果
    #[error("条目 {id} 缺少渲染结果")]
    MissingRenderedHtml { id: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 缺少渲染命令
    #[error("环境变量 {var_name} 未设置，无法构建渲染器")]
    MissingCommand { var_name: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建存储不可达错误
    pub fn store_unreachable(
        target: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Store(StoreError::Unreachable {
            target: target.into(),
            source: Box::new(source),
        })
    }

    /// 创建记录写入错误
    pub fn store_write_failed(
        target: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Store(StoreError::WriteFailed {
            target: target.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建旧格式渲染错误
    pub fn legacy_render_failed(
        id: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        AppError::Render(RenderError::LegacyRenderFailed {
            id: id.into(),
            source: source.into(),
        })
    }

    /// 创建新格式渲染错误
    pub fn new_render_failed(
        id: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        AppError::Render(RenderError::NewRenderFailed {
            id: id.into(),
            source: source.into(),
        })
    }

    /// 是否需要终止整批处理
    ///
    /// 只有旧格式渲染失败和存储不可达是致命的，其余都在条目边界内处理。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Render(RenderError::LegacyRenderFailed { .. })
                | AppError::Store(StoreError::Unreachable { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
