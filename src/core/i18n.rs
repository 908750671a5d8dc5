// i18n 支持：界面提示文案（页码、幻灯片标签、占位与错误提示）的多语言读取。
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::error;

#[derive(Clone, Debug)]
struct I18nState {
    default_language: String,
    supported_languages: Vec<String>,
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nState {
    fn new() -> Self {
        Self {
            default_language: "zh-CN".to_string(),
            supported_languages: vec!["zh-CN".to_string(), "en-US".to_string()],
            messages: builtin_messages(),
        }
    }
}

static I18N_STATE: OnceLock<RwLock<I18nState>> = OnceLock::new();

fn state() -> &'static RwLock<I18nState> {
    I18N_STATE.get_or_init(|| RwLock::new(I18nState::new()))
}

/// 初始化 i18n 配置，与配置文件保持一致。
pub fn configure_i18n(default_language: Option<String>, supported_languages: Option<Vec<String>>) {
    let mut guard = state().write();
    if let Some(values) = supported_languages {
        let cleaned: Vec<String> = values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if !cleaned.is_empty() {
            guard.supported_languages = cleaned;
        }
    }
    if let Some(value) = default_language {
        let cleaned = normalize_language_code(&value, &guard.supported_languages);
        if let Some(cleaned) = cleaned {
            guard.default_language = cleaned;
        }
    }
}

/// 获取当前语言。
pub fn get_language() -> String {
    state().read().default_language.clone()
}

pub fn get_supported_languages() -> Vec<String> {
    state().read().supported_languages.clone()
}

pub fn t(key: &str) -> String {
    t_with_params(key, &HashMap::new())
}

/// 翻译指定 key，并按 `{name}` 占位符替换参数；缺失时返回 key 本身。
pub fn t_with_params(key: &str, params: &HashMap<String, String>) -> String {
    if key.trim().is_empty() {
        return String::new();
    }
    let state = state().read();
    let entry = state.messages.get(key);
    let template = entry
        .and_then(|map| map.get(state.default_language.as_str()))
        .or_else(|| entry.and_then(|map| map.get("zh-CN")))
        .copied()
        .unwrap_or(key);
    if params.is_empty() {
        return template.to_string();
    }
    format_template(template, params)
}

fn normalize_language_code(value: &str, supported: &[String]) -> Option<String> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return None;
    }
    let lower = cleaned.to_lowercase();
    let aliased = match lower.as_str() {
        "zh" | "zh-cn" | "zh-hans" | "zh-hans-cn" => "zh-CN",
        "en" | "en-us" => "en-US",
        _ => cleaned,
    };
    supported
        .iter()
        .find(|lang| lang.eq_ignore_ascii_case(aliased))
        .cloned()
}

fn format_template(template: &str, params: &HashMap<String, String>) -> String {
    static FORMAT_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = FORMAT_RE.get_or_init(|| match Regex::new(r"\{([a-zA-Z0-9_]+)\}") {
        Ok(regex) => Some(regex),
        Err(err) => {
            error!("invalid i18n format regex: {err}");
            None
        }
    });
    let Some(regex) = regex else {
        return template.to_string();
    };
    regex
        .replace_all(template, |caps: &regex::Captures| {
            let key = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            match params.get(key) {
                Some(value) => value.clone(),
                None => caps.get(0).map(|m| m.as_str()).unwrap_or("").to_string(),
            }
        })
        .to_string()
}

fn builtin_messages() -> HashMap<&'static str, HashMap<&'static str, &'static str>> {
    let entries: &[(&str, &str, &str)] = &[
        ("pdf.page_label", "第 {number} 页", "Page {number}"),
        ("slide.label", "第 {number} 张幻灯片", "Slide {number}"),
        ("slide.empty", "（本页无文字内容）", "(No text on this slide)"),
        ("slide.failed", "幻灯片解析失败", "This slide could not be parsed"),
        ("placeholder.title", "文档内容加载中", "Document content is loading"),
        (
            "placeholder.body",
            "暂时无法显示“{filename}”的内容，请稍后重试。",
            "The content of \"{filename}\" cannot be displayed yet. Please try again later.",
        ),
        (
            "placeholder.formats",
            "支持的格式：PDF、DOCX、PPTX。旧版 DOC/PPT 请先另存为新格式。",
            "Supported formats: PDF, DOCX, PPTX. Save legacy DOC/PPT files in the modern format first.",
        ),
        ("placeholder.reason", "原因：{reason}", "Reason: {reason}"),
        ("error.title", "文档解析失败", "Failed to parse document"),
        ("error.file", "文件：{filename}", "File: {filename}"),
        ("error.causes", "可能的原因：", "Possible causes:"),
        ("error.cause_missing", "文件不存在或已被移除", "The file is missing or was removed"),
        (
            "error.cause_unsupported",
            "文件格式不受支持",
            "The file format is not supported",
        ),
        ("error.cause_corrupted", "文件已损坏", "The file is corrupted"),
        ("error.cause_network", "网络连接异常", "A network problem occurred"),
    ];
    let mut messages = HashMap::new();
    for (key, zh, en) in entries {
        messages.insert(*key, HashMap::from([("zh-CN", *zh), ("en-US", *en)]));
    }
    messages
}
