//! 稳定格式化
//!
//! 块级元素各占一行、两格缩进；行内元素和文本留在同一行，空白折叠为一个空格。
//! 输出去掉换行、再去掉标签间空白后重新格式化，结果不变。
//!
//! 词法分析交给 html5ever 的 tokenizer，这里只负责排版。字符引用保持原样，
//! 实体是否解码由流水线里单独的一步决定。

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    self, BufferQueue, Doctype, TagKind, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use phf::phf_set;

use super::SELF_CLOSING_TAGS;

const INDENT: &str = "  ";

static INLINE_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "a", "abbr", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "del", "dfn",
    "em", "i", "img", "input", "ins", "kbd", "label", "mark", "q", "s", "samp", "small",
    "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
};

static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
};

/// 内容按原样读取、不解析标签的元素
static RAW_TEXT_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "script", "style", "textarea", "title",
};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Start(Tag),
    End(String),
    Text(String),
    /// 注释、doctype
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

impl Tag {
    fn render(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 2);
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            // 空值一律写成布尔属性
            if !value.is_empty() {
                out.push_str("=\"");
                out.push_str(&value.replace('"', "&quot;"));
                out.push('"');
            }
        }
        if self.self_closing && !is_void(&self.name) {
            out.push_str("/>");
        } else {
            out.push('>');
        }
        out
    }
}

fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.contains(name)
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(name)
}

/// 格式化 HTML
pub fn format_html(input: &str) -> String {
    let tokens = tokenize(input);
    let mut writer = Writer::default();

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Text(text) => writer.inline.push_text(text),
            Token::Raw(raw) => {
                writer.flush();
                writer.line(raw.trim());
            }
            Token::Start(tag) if is_inline(&tag.name) => writer.inline.push_markup(&tag.render()),
            Token::End(name) if is_inline(name) => {
                writer.inline.push_markup(&format!("</{name}>"));
            }
            Token::Start(tag) => {
                writer.flush();
                if tag.self_closing || is_void(&tag.name) {
                    writer.line(&tag.render());
                } else if let Some(close) = inline_only_close(&tokens, i) {
                    writer.line(&render_single_line(tag, &tokens[i + 1..close]));
                    i = close;
                } else {
                    writer.line(&tag.render());
                    writer.depth += 1;
                }
            }
            Token::End(name) => {
                writer.flush();
                writer.depth = writer.depth.saturating_sub(1);
                writer.line(&format!("</{name}>"));
            }
        }
        i += 1;
    }

    writer.finish()
}

/// 块级元素的内容全是行内内容时，返回其闭合标签的位置
fn inline_only_close(tokens: &[Token], open: usize) -> Option<usize> {
    let Token::Start(tag) = &tokens[open] else {
        return None;
    };

    for (offset, token) in tokens[open + 1..].iter().enumerate() {
        match token {
            Token::Text(_) => {}
            Token::Start(inner) if is_inline(&inner.name) => {}
            Token::End(name) if *name == tag.name => return Some(open + 1 + offset),
            Token::End(name) if is_inline(name) => {}
            _ => return None,
        }
    }

    None
}

fn render_single_line(tag: &Tag, inner: &[Token]) -> String {
    let mut content = InlineBuffer::default();
    for token in inner {
        match token {
            Token::Text(text) => content.push_text(text),
            Token::Start(inner_tag) => content.push_markup(&inner_tag.render()),
            Token::End(name) => content.push_markup(&format!("</{name}>")),
            Token::Raw(raw) => content.push_markup(raw),
        }
    }
    let content = content.take();

    if content.is_empty() && SELF_CLOSING_TAGS.contains(&tag.name.as_str()) {
        let closed = Tag {
            self_closing: true,
            ..tag.clone()
        };
        return closed.render();
    }

    format!("{}{}</{}>", tag.render(), content, tag.name)
}

#[derive(Debug, Default)]
struct InlineBuffer {
    buf: String,
}

impl InlineBuffer {
    fn push_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_ascii_whitespace() {
                if !self.buf.is_empty() && !self.buf.ends_with(' ') {
                    self.buf.push(' ');
                }
            } else {
                self.buf.push(ch);
            }
        }
    }

    fn push_markup(&mut self, markup: &str) {
        self.buf.push_str(markup);
    }

    fn take(&mut self) -> String {
        let content = self.buf.trim_end().to_string();
        self.buf.clear();
        content
    }
}

#[derive(Debug, Default)]
struct Writer {
    lines: Vec<String>,
    depth: usize,
    inline: InlineBuffer,
}

impl Writer {
    fn line(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.lines.push(format!("{}{}", INDENT.repeat(self.depth), text));
    }

    fn flush(&mut self) {
        let content = self.inline.take();
        self.line(&content);
    }

    fn finish(mut self) -> String {
        self.flush();
        self.lines.join("\n")
    }
}

// ========== 词法分析 ==========

fn tokenize(input: &str) -> Vec<Token> {
    let mut queue = BufferQueue::new();
    queue.push_back(StrTendril::from_slice(&protect_ampersands(input)));

    let mut tokenizer = Tokenizer::new(TokenCollector::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();

    let mut collector = tokenizer.sink;
    collector.flush_text();
    collector.tokens
}

/// 每个 `&` 写成 `&amp;`，tokenizer 解码字符引用后正好还原原文
fn protect_ampersands(input: &str) -> String {
    input.replace('&', "&amp;")
}

/// 注释和原始文本元素里不解码字符引用，需要手动还原
fn restore_ampersands(text: &str) -> String {
    text.replace("&amp;", "&")
}

/// 收集词法单元，相邻文本合并为一个
#[derive(Default)]
struct TokenCollector {
    tokens: Vec<Token>,
    text: String,
    in_raw_text: bool,
}

impl TokenCollector {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.tokens.push(Token::Text(text));
        }
    }

    fn push(&mut self, token: Token) {
        self.flush_text();
        self.tokens.push(token);
    }
}

impl TokenSink for TokenCollector {
    type Handle = ();

    fn process_token(&mut self, token: tokenizer::Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            tokenizer::Token::CharacterTokens(text) if self.in_raw_text => {
                self.text.push_str(&restore_ampersands(&text));
            }
            tokenizer::Token::CharacterTokens(text) => self.text.push_str(&text),
            tokenizer::Token::TagToken(tag) if tag.kind == TagKind::EndTag => {
                self.in_raw_text = false;
                self.push(Token::End(tag.name.to_string()));
            }
            tokenizer::Token::TagToken(tag) => {
                let name = tag.name.to_string();
                let raw_text = !tag.self_closing && RAW_TEXT_ELEMENTS.contains(name.as_str());
                let attrs = tag
                    .attrs
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect();
                self.push(Token::Start(Tag {
                    name,
                    attrs,
                    self_closing: tag.self_closing,
                }));

                if raw_text {
                    self.in_raw_text = true;
                    return TokenSinkResult::RawData(RawKind::Rawtext);
                }
            }
            tokenizer::Token::CommentToken(comment) => {
                self.push(Token::Raw(format!("<!--{}-->", restore_ampersands(&comment))));
            }
            tokenizer::Token::DoctypeToken(doctype) => self.push(Token::Raw(render_doctype(&doctype))),
            tokenizer::Token::NullCharacterToken
            | tokenizer::Token::EOFToken
            | tokenizer::Token::ParseError(_) => {}
        }

        TokenSinkResult::Continue
    }
}

fn render_doctype(doctype: &Doctype) -> String {
    let mut out = String::from("<!DOCTYPE");
    if let Some(name) = &doctype.name {
        out.push(' ');
        out.push_str(name);
    }
    match (&doctype.public_id, &doctype.system_id) {
        (Some(public_id), Some(system_id)) => {
            out.push_str(&format!(" PUBLIC \"{public_id}\" \"{system_id}\""));
        }
        (Some(public_id), None) => out.push_str(&format!(" PUBLIC \"{public_id}\"")),
        (None, Some(system_id)) => out.push_str(&format!(" SYSTEM \"{system_id}\"")),
        (None, None) => {}
    }
    out.push('>');
    out
}
