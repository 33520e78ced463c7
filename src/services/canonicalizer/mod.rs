//! HTML 规范化器 - 业务能力层
//!
//! 只负责"把渲染出的 HTML 变成可比较的规范字符串"，不做 I/O。
//!
//! 规则按固定顺序执行，后面的规则依赖前面的结果：
//! 1. 去掉换行
//! 2. 按选项去掉 `class` / `data-testid` / `style`
//! 3. 折叠 `<svg>` 内容
//! 4. base64 数据替换为占位符
//! 5. 去掉拖放埋点属性
//! 6. `blob:` 地址替换为占位符
//! 7. `<path></path>` 等折叠为自闭合
//! 8. 合并重复的 `<em>` / `<strong>`
//! 9. 空属性值改为布尔属性
//! 10. `<b>` / `<i>` 映射为 `<strong>` / `<em>`
//! 11. 去掉标签之间的空白
//! 12. 解码 HTML 实体（可选）
//! 13. 清空卡片 / 工具栏 / 图注内容（可选，基于 DOM）
//! 14. 格式化输出

mod dom;
mod entities;
mod formatter;

pub use dom::DomDocument;
pub use entities::decode_entities;
pub use formatter::format_html;

use crate::models::NormalizationOptions;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// base64 数据的占位符
pub const BASE64_PLACEHOLDER: &str = "BASE64DATA";
/// blob 地址的占位符
pub const BLOB_PLACEHOLDER: &str = "blob:...";
/// 拖放埋点属性前缀
pub const DRAG_DROP_ATTR_PREFIX: &str = "data-koenig-dnd-";

pub const CARD_SELECTOR: &str = "[data-kg-card]";
pub const CARD_TOOLBAR_SELECTOR: &str = "[data-kg-card-toolbar]";
pub const CARD_CAPTION_SELECTOR: &str = "figcaption";

// 规则之间会互相产生新的匹配（如 `<i><em>` 在第 10 步后变成 `<em><em>`），
// 所以整条流水线跑到不动点为止。
const MAX_PASSES: usize = 8;

/// 以开闭标签成对输出、但可以自闭合的 SVG 元素
const SELF_CLOSING_TAGS: [&str; 5] = ["path", "rect", "polyline", "line", "circle"];

static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sclass="[^"]*""#).expect("valid regex"));
static TEST_ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sdata-testid="[^"]*""#).expect("valid regex"));
static STYLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sstyle="[^"]*""#).expect("valid regex"));
static SVG_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg(?:\s[^>]*)?>.*?</svg>").expect("valid regex"));
static BASE64_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[\s"'>(])data:([^;,"'\s]*);([^,"'\s]*),[^"'\s)<]*"#).expect("valid regex")
});
static DRAG_DROP_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"\s{}[\w-]*(?:="[^"]*")?"#,
        regex::escape(DRAG_DROP_ATTR_PREFIX)
    ))
    .expect("valid regex")
});
static BLOB_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"blob:http[^"'\s<>)]*"#).expect("valid regex"));
static OPEN_CLOSE_PAIRS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SELF_CLOSING_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"<({tag})(\s[^>]*?)?\s*/?>\s*</{tag}\s*>")).expect("valid regex")
        })
        .collect()
});
static DOUBLED_WRAPPERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"<em>\s*<em>").expect("valid regex"), "<em>"),
        (Regex::new(r"</em>\s*</em>").expect("valid regex"), "</em>"),
        (Regex::new(r"<strong>\s*<strong>").expect("valid regex"), "<strong>"),
        (Regex::new(r"</strong>\s*</strong>").expect("valid regex"), "</strong>"),
    ]
});
static EMPTY_ATTR_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\s[^\s"'=<>/]+)="""#).expect("valid regex"));
static LEGACY_TAGS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"<b(\s[^>]*)?>").expect("valid regex"), "<strong${1}>"),
        (Regex::new(r"</b\s*>").expect("valid regex"), "</strong>"),
        (Regex::new(r"<i(\s[^>]*)?>").expect("valid regex"), "<em${1}>"),
        (Regex::new(r"</i\s*>").expect("valid regex"), "</em>"),
    ]
});
static INTER_TAG_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));

/// HTML 规范化器
///
/// 持有一组规范化选项，两条渲染管线的输出必须用同一个实例处理。
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer {
    options: NormalizationOptions,
}

impl Canonicalizer {
    pub fn new(options: NormalizationOptions) -> Self {
        Self { options }
    }

    pub fn canonicalize(&self, html: &str) -> String {
        canonicalize(html, &self.options)
    }
}

/// 把 HTML 变成规范字符串
///
/// 纯函数：确定、幂等、不会失败。畸形标记按 HTML 词法规则处理。
pub fn canonicalize(html: &str, options: &NormalizationOptions) -> String {
    let (output, converged) = fixed_point(html, MAX_PASSES, |current| canonicalize_once(current, options));

    if !converged {
        tracing::debug!(
            "规范化在 {} 轮后仍未收敛: {}",
            MAX_PASSES,
            crate::utils::truncate_text(html, 120)
        );
    }

    output
}

/// 反复执行 `pass` 直到结果不再变化
///
/// # 返回
/// （最后一轮的结果, 是否在 `max_passes` 轮内收敛）
fn fixed_point(input: &str, max_passes: usize, pass: impl Fn(&str) -> String) -> (String, bool) {
    let mut current = pass(input);

    for _ in 1..max_passes {
        let next = pass(&current);
        if next == current {
            return (current, true);
        }
        current = next;
    }

    (current, false)
}

fn canonicalize_once(html: &str, options: &NormalizationOptions) -> String {
    let mut output = html.replace(['\n', '\r'], "");

    if options.ignore_classes {
        output = replace_all(&CLASS_ATTR, output, "");
    }

    if options.ignore_data_test_id {
        output = replace_all(&TEST_ID_ATTR, output, "");
    }

    if options.ignore_inline_styles {
        output = replace_all(&STYLE_ATTR, output, "");
    }

    if options.ignore_inner_svg {
        output = replace_all(&SVG_BLOCK, output, "<svg></svg>");
    }

    if options.get_base64_file_format {
        let replacement = format!("${{1}}data:${{2}};${{3}},{BASE64_PLACEHOLDER}");
        output = replace_all(&BASE64_DATA, output, &replacement);
    }

    if options.ignore_drag_drop_attrs {
        output = replace_all(&DRAG_DROP_ATTR, output, "");
    }

    output = replace_all(&BLOB_URL, output, BLOB_PLACEHOLDER);

    for pair in OPEN_CLOSE_PAIRS.iter() {
        output = replace_all(pair, output, "<${1}${2}/>");
    }

    output = collapse_doubled_wrappers(output);

    output = replace_all(&EMPTY_ATTR_VALUE, output, "${1}");

    for (legacy, replacement) in LEGACY_TAGS.iter() {
        output = replace_all(legacy, output, replacement);
    }

    output = replace_all(&INTER_TAG_WHITESPACE, output, "><");

    if options.decode_entities {
        output = decode_entities(&output);
    }

    if options.needs_dom() {
        output = clear_card_contents(&output, options);
    }

    format_html(&output)
}

/// 合并 `<em><em>` / `<strong><strong>`，直到不再出现
fn collapse_doubled_wrappers(mut output: String) -> String {
    loop {
        let before = output.len();
        for (doubled, single) in DOUBLED_WRAPPERS.iter() {
            output = replace_all(doubled, output, single);
        }
        if output.len() == before {
            return output;
        }
    }
}

fn clear_card_contents(html: &str, options: &NormalizationOptions) -> String {
    let mut selectors = Vec::new();
    if options.ignore_card_contents {
        selectors.push(CARD_SELECTOR);
    }
    if options.ignore_card_toolbar_contents {
        selectors.push(CARD_TOOLBAR_SELECTOR);
    }
    if options.ignore_card_caption_contents {
        selectors.push(CARD_CAPTION_SELECTOR);
    }

    let mut document = DomDocument::parse(html);
    let cleared = document.clear_children_matching(&selectors.join(", "));
    if cleared == 0 {
        tracing::trace!("没有需要清空的卡片节点");
    }
    document.body_html().unwrap_or_else(|| html.to_string())
}

fn replace_all(re: &Regex, input: String, replacement: &str) -> String {
    match re.replace_all(&input, replacement) {
        Cow::Borrowed(_) => input,
        Cow::Owned(replaced) => replaced,
    }
}
