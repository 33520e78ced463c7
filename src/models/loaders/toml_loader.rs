use crate::models::NormalizationOptions;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载规范化选项
///
/// 文件不存在时使用默认选项；文件存在但无法解析时返回错误。
pub async fn load_options_file(toml_file_path: &Path) -> Result<NormalizationOptions> {
    if !fs::try_exists(toml_file_path).await.unwrap_or(false) {
        tracing::info!(
            "未找到选项文件 {}，使用默认规范化选项",
            toml_file_path.display()
        );
        return Ok(NormalizationOptions::default());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let options: NormalizationOptions = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    tracing::debug!("已加载规范化选项: {:?}", options);

    Ok(options)
}
