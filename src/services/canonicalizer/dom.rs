//! 基于 DOM 的内容清空
//!
//! 只暴露"解析 → 按选择器查找 → 清空子树 → 序列化"这几个能力，
//! 底层解析器是 `scraper`（html5ever）。

use scraper::{Html, Selector};
use std::sync::LazyLock;

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// 解析后的 HTML 文档
pub struct DomDocument {
    html: Html,
}

impl DomDocument {
    /// 解析 HTML（片段会被放进 `<body>`）
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// 清空所有匹配节点的子节点，返回匹配的节点数
    ///
    /// 选择器无效时不做任何修改。
    pub fn clear_children_matching(&mut self, selectors: &str) -> usize {
        let selector = match Selector::parse(selectors) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::warn!("无效的选择器 `{}`: {:?}", selectors, e);
                return 0;
            }
        };

        let ids: Vec<_> = self.html.select(&selector).map(|element| element.id()).collect();

        for id in &ids {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                while let Some(mut child) = node.first_child() {
                    child.detach();
                }
            }
        }

        ids.len()
    }

    /// 序列化 `<body>` 的内容
    pub fn body_html(&self) -> Option<String> {
        self.html.select(&BODY).next().map(|body| body.inner_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_matching_nodes() {
        let mut document = DomDocument::parse(
            r#"<div data-kg-card="embed"><iframe src="x"></iframe></div><figure><figcaption>hi</figcaption></figure>"#,
        );
        let cleared = document.clear_children_matching("[data-kg-card], figcaption");
        assert_eq!(cleared, 2);
        assert_eq!(
            document.body_html().unwrap(),
            r#"<div data-kg-card="embed"></div><figure><figcaption></figcaption></figure>"#
        );
    }

    #[test]
    fn test_nested_matches() {
        let mut document =
            DomDocument::parse(r#"<div data-kg-card="a"><div data-kg-card-toolbar="b"><span>t</span></div></div>"#);
        let cleared = document.clear_children_matching("[data-kg-card], [data-kg-card-toolbar]");
        assert_eq!(cleared, 2);
        assert_eq!(document.body_html().unwrap(), r#"<div data-kg-card="a"></div>"#);
    }

    #[test]
    fn test_no_match_is_noop() {
        let mut document = DomDocument::parse("<p>x</p>");
        assert_eq!(document.clear_children_matching("figcaption"), 0);
        assert_eq!(document.body_html().unwrap(), "<p>x</p>");
    }

    #[test]
    fn test_invalid_selector_is_noop() {
        let mut document = DomDocument::parse("<p>x</p>");
        assert_eq!(document.clear_children_matching("[[["), 0);
        assert_eq!(document.body_html().unwrap(), "<p>x</p>");
    }
}
