//! HTML 实体解码
//!
//! 除了 `&lt;` `&gt;` `&amp;` `&quot;` 之外的实体都解码为字符，
//! 这四个的数字形式统一成命名形式，避免解码后凭空出现标签。

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid regex")
});

/// 解码 HTML 实体
pub fn decode_entities(input: &str) -> String {
    ENTITY
        .replace_all(input, |caps: &Captures<'_>| decode_one(&caps[0]))
        .into_owned()
}

fn decode_one(entity: &str) -> String {
    let decoded = html_escape::decode_html_entities(entity);
    match decoded.as_ref() {
        "<" => "&lt;".to_string(),
        ">" => "&gt;".to_string(),
        "&" => "&amp;".to_string(),
        "\"" => "&quot;".to_string(),
        other => other.to_string(),
    }
}
