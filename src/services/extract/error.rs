use std::fmt;
use thiserror::Error;

/// 单个字节来源的尝试记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAttempt {
    pub source: String,
    pub reason: String,
}

/// 所有字节来源都失败时的聚合错误。
#[derive(Debug, Clone, Error)]
#[error("{}", describe_attempts(.filename, .attempts))]
pub struct LoadError {
    pub filename: String,
    pub attempts: Vec<SourceAttempt>,
}

fn describe_attempts(filename: &str, attempts: &[SourceAttempt]) -> String {
    if attempts.is_empty() {
        return format!("no source configured for {filename}");
    }
    let reasons = attempts
        .iter()
        .map(|attempt| format!("{} ({})", attempt.source, attempt.reason))
        .collect::<Vec<_>>()
        .join("; ");
    format!("no source could provide {filename}: {reasons}")
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("unsupported file format: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("legacy .{extension} files are not supported, please convert the file to .{modern} and upload it again")]
    LegacyFormat {
        extension: &'static str,
        modern: &'static str,
    },

    #[error("{format} parser is unavailable: {reason}")]
    DependencyUnavailable { format: String, reason: String },

    #[error("failed to parse {format} document: {detail}")]
    Parse { format: String, detail: String },

    #[error("internal extraction failure: {0}")]
    Internal(String),
}

impl ExtractError {
    pub fn parse(format: impl Into<String>, detail: impl fmt::Display) -> Self {
        ExtractError::Parse {
            format: format.into(),
            detail: detail.to_string(),
        }
    }

    /// 仅内部故障（任务崩溃、非加载类错误）视为意外，其余走兜底内容。
    pub fn is_unexpected(&self) -> bool {
        matches!(self, ExtractError::Internal(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExtractError::Load(_) => "LOAD_FAILED",
            ExtractError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            ExtractError::LegacyFormat { .. } => "LEGACY_FORMAT",
            ExtractError::DependencyUnavailable { .. } => "DEPENDENCY_UNAVAILABLE",
            ExtractError::Parse { .. } => "PARSE_FAILED",
            ExtractError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// 单页幻灯片的提取失败，只在 PPTX 解析器内部消化。
#[derive(Debug, Clone, Error)]
#[error("slide {slide} failed: {detail}")]
pub struct SlideExtractionError {
    pub slide: usize,
    pub detail: String,
}
