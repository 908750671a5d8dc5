// 格式分发：按扩展名选择解析器，并记录各解析库的可用状态。
use super::docx::DocxParser;
use super::error::ExtractError;
use super::legacy::LegacyParser;
use super::pdf::PdfParser;
use super::pptx::PptxParser;
use super::types::ParseResult;
use crate::config::FormatsConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Pptx,
    Doc,
    Ppt,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 5] = [
        DocumentFormat::Pdf,
        DocumentFormat::Docx,
        DocumentFormat::Pptx,
        DocumentFormat::Doc,
        DocumentFormat::Ppt,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Ppt => "ppt",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        DocumentFormat::ALL
            .into_iter()
            .find(|format| format.extension() == normalized)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 最后一个 `.` 之后的子串（小写）；没有 `.` 时为空串。
pub fn extension_of(filename: &str) -> String {
    match filename.trim().rfind('.') {
        Some(idx) => filename.trim()[idx + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// 各格式解析器的统一接口；解析是同步的，由编排器放到阻塞线程执行。
pub trait DocumentParser: Send + Sync {
    fn format(&self) -> DocumentFormat;

    /// 在加载字节之前调用，桩解析器在此直接失败。
    fn ensure_ready(&self) -> Result<(), ExtractError> {
        Ok(())
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParseResult, ExtractError>;
}

#[derive(Clone)]
enum ParserSlot {
    Pending,
    Ready(Arc<dyn DocumentParser>),
    Unavailable(String),
}

/// 解析器注册表：由启动流程显式注入，不在调用时探测。
#[derive(Clone)]
pub struct ParserRegistry {
    slots: HashMap<DocumentFormat, ParserSlot>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// 所有格式处于待加载状态，`is_ready` 为 false。
    pub fn new() -> Self {
        let slots = DocumentFormat::ALL
            .into_iter()
            .map(|format| (format, ParserSlot::Pending))
            .collect();
        Self { slots }
    }

    /// 安装内置解析器；配置中禁用的格式标记为不可用。
    pub fn bootstrap(config: &FormatsConfig) -> Self {
        let mut registry = Self::new();
        let builtin: [Arc<dyn DocumentParser>; 5] = [
            Arc::new(PdfParser),
            Arc::new(DocxParser),
            Arc::new(PptxParser),
            Arc::new(LegacyParser::new(DocumentFormat::Doc)),
            Arc::new(LegacyParser::new(DocumentFormat::Ppt)),
        ];
        for parser in builtin {
            let format = parser.format();
            let disabled = config
                .disabled
                .iter()
                .any(|item| DocumentFormat::from_extension(item) == Some(format));
            if disabled {
                warn!("{format} parser disabled by configuration");
                registry.mark_unavailable(format, "disabled by configuration");
            } else {
                registry.install(parser);
            }
        }
        info!("parser registry ready: {:?}", registry.available_formats());
        registry
    }

    pub fn install(&mut self, parser: Arc<dyn DocumentParser>) {
        self.slots.insert(parser.format(), ParserSlot::Ready(parser));
    }

    pub fn mark_unavailable(&mut self, format: DocumentFormat, reason: impl Into<String>) {
        self.slots
            .insert(format, ParserSlot::Unavailable(reason.into()));
    }

    /// 每个格式都至少尝试过一次加载（成功或失败）。
    pub fn is_ready(&self) -> bool {
        self.slots
            .values()
            .all(|slot| !matches!(slot, ParserSlot::Pending))
    }

    pub fn available_formats(&self) -> Vec<DocumentFormat> {
        DocumentFormat::ALL
            .into_iter()
            .filter(|format| matches!(self.slots.get(format), Some(ParserSlot::Ready(_))))
            .collect()
    }

    pub fn resolve(&self, filename: &str) -> Result<Arc<dyn DocumentParser>, ExtractError> {
        let extension = extension_of(filename);
        let format = DocumentFormat::from_extension(&extension)
            .ok_or(ExtractError::UnsupportedFormat { extension })?;
        match self.slots.get(&format) {
            Some(ParserSlot::Ready(parser)) => Ok(parser.clone()),
            Some(ParserSlot::Unavailable(reason)) => Err(ExtractError::DependencyUnavailable {
                format: format.to_string(),
                reason: reason.clone(),
            }),
            Some(ParserSlot::Pending) | None => Err(ExtractError::DependencyUnavailable {
                format: format.to_string(),
                reason: "parser not initialized".to_string(),
            }),
        }
    }
}
