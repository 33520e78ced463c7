use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 语料导出文件
    pub corpus_file: String,
    /// 不匹配产物目录
    pub results_dir: String,
    /// 彩色 diff 目录
    pub diffs_dir: String,
    /// 是否生成彩色 diff
    pub write_diffs: bool,
    /// 状态回写文件
    pub status_file: String,
    /// 是否回写状态
    pub write_back: bool,
    /// 运行汇总文件
    pub summary_file: String,
    /// 是否随机顺序处理
    pub random_order: bool,
    /// 规范化选项文件（TOML）
    pub options_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 外部渲染命令 ---
    pub legacy_render_cmd: Option<String>,
    pub convert_cmd: Option<String>,
    pub new_render_cmd: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_file: "export.json".to_string(),
            results_dir: "results".to_string(),
            diffs_dir: "diffs".to_string(),
            write_diffs: false,
            status_file: "results/status.jsonl".to_string(),
            write_back: true,
            summary_file: "results/summary.json".to_string(),
            random_order: false,
            options_file: "normalize.toml".to_string(),
            verbose_logging: false,
            legacy_render_cmd: None,
            convert_cmd: None,
            new_render_cmd: None,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    ///
    /// 布尔开关只接受 `true` / `false`，其他值报错而不是静默回退。
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            corpus_file: std::env::var("CORPUS_FILE").unwrap_or(default.corpus_file),
            results_dir: std::env::var("RESULTS_DIR").unwrap_or(default.results_dir),
            diffs_dir: std::env::var("DIFFS_DIR").unwrap_or(default.diffs_dir),
            write_diffs: bool_var("WRITE_DIFFS", default.write_diffs)?,
            status_file: std::env::var("STATUS_FILE").unwrap_or(default.status_file),
            write_back: bool_var("WRITE_BACK", default.write_back)?,
            summary_file: std::env::var("SUMMARY_FILE").unwrap_or(default.summary_file),
            random_order: bool_var("RANDOM_ORDER", default.random_order)?,
            options_file: std::env::var("OPTIONS_FILE").unwrap_or(default.options_file),
            verbose_logging: bool_var("VERBOSE_LOGGING", default.verbose_logging)?,
            legacy_render_cmd: non_empty_var("LEGACY_RENDER_CMD"),
            convert_cmd: non_empty_var("CONVERT_CMD"),
            new_render_cmd: non_empty_var("NEW_RENDER_CMD"),
        })
    }

    /// 取出必需的渲染命令
    ///
    /// # 参数
    /// - `var_name`: 对应的环境变量名（用于报错）
    /// - `value`: 配置中的命令
    pub fn require_command<'a>(
        var_name: &str,
        value: &'a Option<String>,
    ) -> Result<&'a str, ConfigError> {
        value.as_deref().ok_or_else(|| ConfigError::MissingCommand {
            var_name: var_name.to_string(),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn bool_var(name: &str, default: bool) -> Result<bool, ConfigError> {
    parse_bool(name, non_empty_var(name), default)
}

fn parse_bool(name: &str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: "bool".to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.corpus_file, "export.json");
        assert_eq!(config.results_dir, "results");
        assert!(config.write_back);
        assert!(!config.random_order);
        assert!(config.legacy_render_cmd.is_none());
    }

    #[test]
    fn test_parse_bool() {
        assert!(!parse_bool("WRITE_BACK", Some("false".to_string()), true).unwrap());
        assert!(parse_bool("RANDOM_ORDER", Some(" true ".to_string()), false).unwrap());
        assert!(parse_bool("WRITE_DIFFS", None, true).unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_unknown_values() {
        let err = parse_bool("WRITE_BACK", Some("yes".to_string()), true).unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::EnvVarParseFailed { var_name, value, .. }
                if var_name == "WRITE_BACK" && value == "yes"
        ));
        assert!(err.to_string().contains("WRITE_BACK"));
    }

    #[test]
    fn test_require_command() {
        let present = Some("node render.js".to_string());
        assert_eq!(Config::require_command("LEGACY_RENDER_CMD", &present).unwrap(), "node render.js");

        let err = Config::require_command("CONVERT_CMD", &None).unwrap_err();
        assert!(err.to_string().contains("CONVERT_CMD"));
    }
}
