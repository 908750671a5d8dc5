use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单个解析器的归一化输出。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub text: String,
    pub html: String,
    pub page_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    RealFile,
    Fallback,
    Cached,
    Default,
    Error,
}

impl OutcomeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeSource::RealFile => "real_file",
            OutcomeSource::Fallback => "fallback",
            OutcomeSource::Cached => "cached",
            OutcomeSource::Default => "default",
            OutcomeSource::Error => "error",
        }
    }
}

/// 对外返回的提取结果；失败时 `html_content` 始终是可渲染的占位或错误片段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    pub success: bool,
    pub title: String,
    pub html_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub extracted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub source: OutcomeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub size: usize,
    pub filenames: Vec<String>,
}

/// 标题推导：正文首个非空行足够短时直接使用，否则退回去掉扩展名的文件名。
pub fn derive_title(text: &str, filename: &str) -> String {
    const MAX_TITLE_CHARS: usize = 100;
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty());
    match first_line {
        Some(line) if line.chars().count() < MAX_TITLE_CHARS => line.to_string(),
        _ => filename_stem(filename),
    }
}

pub fn filename_stem(filename: &str) -> String {
    let trimmed = filename.trim();
    match trimmed.rfind('.') {
        Some(idx) if idx > 0 => trimmed[..idx].to_string(),
        _ => trimmed.to_string(),
    }
}
