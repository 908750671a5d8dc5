// 文档提取管线：来源加载、格式分发、各格式解析、缓存与降级。
pub mod dispatch;
pub mod docx;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod format;
pub mod legacy;
pub mod loader;
mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod slide_text;
pub mod types;

pub use dispatch::{extension_of, DocumentFormat, DocumentParser, ParserRegistry};
pub use error::{ExtractError, LoadError, SlideExtractionError, SourceAttempt};
pub use extractor::{DocumentExtractor, RevalidationPolicy};
pub use fallback::{FallbackDocument, FallbackLibrary};
pub use loader::{
    ByteSource, DocumentLoader, PickedFileSource, PickedFiles, RemoteSource, SourceChain,
    UploadsDirSource,
};
pub use types::{CacheInfo, ExtractionOutcome, OutcomeSource, ParseResult};
