//! 规范化选项

use serde::{Deserialize, Serialize};

/// 规范化选项
///
/// 每个选项独立开关，键名与配置文件中的 camelCase 一致。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NormalizationOptions {
    /// 去掉所有 `class` 属性
    pub ignore_classes: bool,
    /// 去掉 `data-testid` 属性
    pub ignore_data_test_id: bool,
    /// 去掉 `style` 属性
    pub ignore_inline_styles: bool,
    /// `<svg>…</svg>` 折叠为空 `<svg></svg>`
    #[serde(rename = "ignoreInnerSVG")]
    pub ignore_inner_svg: bool,
    /// base64 数据替换为占位符，保留 MIME 类型
    pub get_base64_file_format: bool,
    /// 去掉拖放埋点属性
    pub ignore_drag_drop_attrs: bool,
    /// 清空卡片内容
    pub ignore_card_contents: bool,
    /// 清空卡片工具栏内容
    pub ignore_card_toolbar_contents: bool,
    /// 清空 `<figcaption>` 内容
    pub ignore_card_caption_contents: bool,
    /// 解码 HTML 实体
    pub decode_entities: bool,
}

impl NormalizationOptions {
    /// 是否需要解析 DOM
    pub fn needs_dom(&self) -> bool {
        self.ignore_card_contents
            || self.ignore_card_toolbar_contents
            || self.ignore_card_caption_contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_keys() {
        let options: NormalizationOptions = toml::from_str(
            r#"
            ignoreClasses = true
            ignoreDataTestId = true
            ignoreInnerSVG = true
            getBase64FileFormat = true
            "#,
        )
        .unwrap();

        assert!(options.ignore_classes);
        assert!(options.ignore_data_test_id);
        assert!(options.ignore_inner_svg);
        assert!(options.get_base64_file_format);
        assert!(!options.ignore_inline_styles);
        assert!(!options.needs_dom());
    }

    #[test]
    fn test_needs_dom() {
        let options = NormalizationOptions {
            ignore_card_caption_contents: true,
            ..Default::default()
        };
        assert!(options.needs_dom());
    }
}
