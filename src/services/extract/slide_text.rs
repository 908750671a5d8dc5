// 幻灯片文字提取的多级兜底链：按顺序尝试各策略，首个产出非空结果者胜出。
use super::ooxml::decode_entities;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, error};

/// 文本框外层结构的后代选择器，`a:t` 节点缺失时使用。
const TEXT_BODY_SELECTORS: &[&[&str]] = &[
    &["p:txBody", "a:p"],
    &["p:sp", "p:txBody"],
    &["a:txBody", "a:p"],
    &["p:graphicFrame", "a:tc"],
];

/// 解析树的最大嵌套层数；超出时放弃建树，只走正则策略。
const MAX_TREE_DEPTH: usize = 256;

/// 通用闭合标签兜底识别的元素本地名。
const GENERIC_TEXT_TAGS: &str = "t|text|val|v";

pub const LAST_RESORT: &str = "strip tags";

type Strategy = fn(&SlideSource<'_>) -> Vec<String>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("a:t nodes", text_nodes),
    ("text-body selectors", text_body_selectors),
    ("a:t regex", a_t_regex),
    ("generic tags", generic_tags),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideText {
    pub text: String,
    pub strategy: &'static str,
}

/// 单页幻灯片 XML 及其解析树；XML 不合法时 `tree` 为空，仅正则策略可用。
pub struct SlideSource<'a> {
    raw: &'a str,
    tree: Option<XmlElement>,
}

impl<'a> SlideSource<'a> {
    pub fn new(raw: &'a str) -> Self {
        let tree = match parse_tree(raw) {
            Ok(tree) => Some(tree),
            Err(err) => {
                debug!("slide xml is not well-formed: {err}");
                None
            }
        };
        Self { raw, tree }
    }
}

/// 不会失败：所有策略都为空时退化为去标签的纯文本（可能为空串）。
pub fn extract_slide_text(raw: &str) -> SlideText {
    let source = SlideSource::new(raw);
    for &(name, strategy) in STRATEGIES {
        let values = strategy(&source);
        if !values.is_empty() {
            return SlideText {
                text: dedup_join(values),
                strategy: name,
            };
        }
    }
    SlideText {
        text: strip_all_tags(raw),
        strategy: LAST_RESORT,
    }
}

fn dedup_join(values: Vec<String>) -> String {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            ordered.push(value);
        }
    }
    ordered.join(" ")
}

#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    children: Vec<XmlNode>,
}

#[derive(Debug)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    fn new(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            children: Vec::new(),
        }
    }

    fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    fn text_content(&self) -> String {
        let mut output = String::new();
        self.collect_text(&mut output);
        output
    }

    fn collect_text(&self, output: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => output.push_str(text),
                XmlNode::Element(element) => element.collect_text(output),
            }
        }
    }
}

fn parse_tree(raw: &str) -> Result<XmlElement, String> {
    let mut reader = XmlReader::from_str(raw);
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut stack = vec![XmlElement::default()];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if stack.len() > MAX_TREE_DEPTH {
                    return Err(format!("nesting deeper than {MAX_TREE_DEPTH} levels"));
                }
                stack.push(XmlElement::new(e.name().as_ref()));
            }
            Ok(Event::Empty(ref e)) => {
                let element = XmlElement::new(e.name().as_ref());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Element(element));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err("unexpected closing tag".to_string());
                }
                if let Some(element) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Element(element));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.to_string()),
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(format!("{} unclosed element(s)", stack.len() - 1));
    }
    stack.pop().ok_or_else(|| "empty document".to_string())
}

fn push_trimmed(values: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        values.push(trimmed.to_string());
    }
}

fn text_nodes(source: &SlideSource<'_>) -> Vec<String> {
    fn visit(element: &XmlElement, values: &mut Vec<String>) {
        for child in element.elements() {
            if child.name == "a:t" || child.name == "t" {
                push_trimmed(values, &child.text_content());
            } else {
                visit(child, values);
            }
        }
    }

    let mut values = Vec::new();
    if let Some(tree) = &source.tree {
        visit(tree, &mut values);
    }
    values
}

fn text_body_selectors(source: &SlideSource<'_>) -> Vec<String> {
    let Some(tree) = &source.tree else {
        return Vec::new();
    };
    for selector in TEXT_BODY_SELECTORS {
        let mut matches = Vec::new();
        select_descendants(tree, selector, 0, &mut matches);
        let mut values = Vec::new();
        for element in matches {
            push_trimmed(&mut values, &element.text_content());
        }
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}

/// 后代选择器匹配：沿祖先链贪心匹配路径，命中最后一段即收集。
fn select_descendants<'t>(
    element: &'t XmlElement,
    path: &[&str],
    matched: usize,
    output: &mut Vec<&'t XmlElement>,
) {
    for child in element.elements() {
        if child.name == path[matched] {
            if matched + 1 == path.len() {
                output.push(child);
            } else {
                select_descendants(child, path, matched + 1, output);
            }
        } else {
            select_descendants(child, path, matched, output);
        }
    }
}

fn a_t_regex(source: &SlideSource<'_>) -> Vec<String> {
    static SPAN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(span_re) = cached_regex(&SPAN_RE, r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>") else {
        return Vec::new();
    };
    let mut values = Vec::new();
    for caps in span_re.captures_iter(source.raw) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let stripped = strip_inline_tags(inner);
        push_trimmed(&mut values, &decode_entities(&stripped));
    }
    values
}

fn generic_tags(source: &SlideSource<'_>) -> Vec<String> {
    static GENERIC_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = format!(r">([^<>]+)</(?:[A-Za-z0-9_.-]+:)?(?:{GENERIC_TEXT_TAGS})>");
    let Some(generic_re) = cached_regex(&GENERIC_RE, &pattern) else {
        return Vec::new();
    };
    let mut values = Vec::new();
    for caps in generic_re.captures_iter(source.raw) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let decoded = decode_entities(inner.trim());
        if decoded.chars().count() >= 2 {
            values.push(decoded);
        }
    }
    values
}

fn strip_inline_tags(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => output.push(ch),
            _ => {}
        }
    }
    output
}

/// 最后兜底：标签替换为空白并折叠空白。
fn strip_all_tags(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => {
                in_tag = true;
                output.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => output.push(ch),
            _ => {}
        }
    }
    let collapsed = output.split_whitespace().collect::<Vec<_>>().join(" ");
    decode_entities(&collapsed)
}

fn cached_regex(slot: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    slot.get_or_init(|| match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            error!("invalid slide text regex {pattern}: {err}");
            None
        }
    })
    .as_ref()
}
