//! 彩色 diff 写入服务
//!
//! 用 `git diff --no-index --color=always` 对比两个规范化 HTML 文件，
//! 输出写到 `<dir>/<id>.ansi`。只是排查辅助，失败不影响条目状态。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppError, AppResult, FileError, RenderError};

const DIFF_PROGRAM: &str = "git";

/// 彩色 diff 写入服务
#[derive(Debug, Clone)]
pub struct DiffWriter {
    dir: PathBuf,
}

impl DiffWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn diff_path(&self, file_stem: &str) -> PathBuf {
        self.dir.join(format!("{file_stem}.ansi"))
    }

    /// 生成 diff 文件
    ///
    /// # 参数
    /// - `file_stem`: 输出文件名（不含扩展名）
    /// - `expected`: 旧格式规范化 HTML 文件
    /// - `actual`: 新格式规范化 HTML 文件
    pub async fn write(&self, file_stem: &str, expected: &Path, actual: &Path) -> AppResult<PathBuf> {
        let output = Command::new(DIFF_PROGRAM)
            .args(["diff", "--no-index", "--color=always"])
            .arg(actual)
            .arg(expected)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RenderError::CommandSpawnFailed {
                command: DIFF_PROGRAM.to_string(),
                source,
            })?;

        // 退出码 1 表示存在差异
        match output.status.code() {
            Some(0) | Some(1) => {}
            code => {
                return Err(RenderError::CommandFailed {
                    command: DIFF_PROGRAM.to_string(),
                    code,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                }
                .into())
            }
        }

        fs::create_dir_all(&self.dir).await.map_err(|source| FileError::CreateDirFailed {
            path: self.dir.display().to_string(),
            source,
        })?;

        let path = self.diff_path(file_stem);
        fs::write(&path, &output.stdout)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        debug!("已写入 diff: {}", path.display());
        Ok(path)
    }

    /// 删除 diff 文件，不存在时什么都不做
    pub async fn remove(&self, file_stem: &str) -> AppResult<()> {
        let path = self.diff_path(file_stem);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::file_write_failed(path.display().to_string(), e)),
        }
    }
}
