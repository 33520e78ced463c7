//! 外部命令渲染器 - 基础设施层
//!
//! 把文档 JSON 写入外部命令的 stdin，读取 stdout 作为结果。
//! 一个实例只对应一条命令，可以同时充当渲染器或转换器。

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value as JsonValue;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppResult, ConversionError, RenderError};
use crate::infrastructure::renderers::{FormatConverter, LegacyRenderer, NewRenderer};

/// 外部命令渲染器
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: String,
}

impl CommandRenderer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// 执行命令
    ///
    /// # 参数
    /// - `input`: 写入 stdin 的内容
    ///
    /// # 返回
    /// 命令的 stdout（UTF-8）
    pub async fn run(&self, input: &str) -> AppResult<String> {
        debug!("执行外部命令: {} (输入 {} 字节)", self.command, input.len());

        let mut child = shell(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::CommandSpawnFailed {
                command: self.command.clone(),
                source,
            })?;

        // stdin 单独写，避免子进程先写满 stdout 时互相等待
        let writer = child.stdin.take().map(|mut stdin| {
            let bytes = input.as_bytes().to_vec();
            tokio::spawn(async move {
                let result = stdin.write_all(&bytes).await;
                drop(stdin);
                result
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| RenderError::CommandSpawnFailed {
                command: self.command.clone(),
                source,
            })?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // 子进程提前退出时写入会失败，以退出码为准
                Ok(Err(e)) => debug!("写入 stdin 失败: {}", e),
                Err(e) => debug!("stdin 写入任务失败: {}", e),
            }
        }

        if !output.status.success() {
            return Err(RenderError::CommandFailed {
                command: self.command.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        String::from_utf8(output.stdout).map_err(|e| {
            RenderError::InvalidOutput {
                command: self.command.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// 以 JSON 文档为输入执行命令
    pub async fn run_json(&self, document: &JsonValue) -> AppResult<String> {
        self.run(&document.to_string()).await
    }
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

impl LegacyRenderer for CommandRenderer {
    fn render<'a>(&'a self, document: &'a JsonValue) -> BoxFuture<'a, anyhow::Result<String>> {
        async move { Ok(self.run_json(document).await?) }.boxed()
    }
}

impl NewRenderer for CommandRenderer {
    fn render<'a>(&'a self, document: &'a JsonValue) -> BoxFuture<'a, anyhow::Result<String>> {
        async move { Ok(self.run_json(document).await?) }.boxed()
    }
}

impl FormatConverter for CommandRenderer {
    fn convert<'a>(
        &'a self,
        document: &'a JsonValue,
    ) -> BoxFuture<'a, Result<JsonValue, ConversionError>> {
        async move {
            let stdout = self
                .run_json(document)
                .await
                .map_err(|e| ConversionError::new(e.to_string()))?;
            serde_json::from_str(&stdout)
                .map_err(|e| ConversionError::new(format!("转换结果不是有效 JSON: {e}")))
        }
        .boxed()
    }
}
