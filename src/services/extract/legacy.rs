use super::dispatch::{DocumentFormat, DocumentParser};
use super::error::ExtractError;
use super::types::ParseResult;

/// 旧版 DOC/PPT 的占位解析器：已注册但始终提示转换为新格式。
pub struct LegacyParser {
    format: DocumentFormat,
}

impl LegacyParser {
    pub fn new(format: DocumentFormat) -> Self {
        Self { format }
    }

    fn unsupported(&self) -> ExtractError {
        let modern = match self.format {
            DocumentFormat::Ppt | DocumentFormat::Pptx => "pptx",
            _ => "docx",
        };
        ExtractError::LegacyFormat {
            extension: self.format.extension(),
            modern,
        }
    }
}

impl DocumentParser for LegacyParser {
    fn format(&self) -> DocumentFormat {
        self.format
    }

    fn ensure_ready(&self) -> Result<(), ExtractError> {
        Err(self.unsupported())
    }

    fn parse(&self, _bytes: &[u8]) -> Result<ParseResult, ExtractError> {
        Err(self.unsupported())
    }
}
