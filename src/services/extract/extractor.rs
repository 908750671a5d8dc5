// 提取编排：缓存命中、强制重新解析、实时解析与逐级降级。
use super::dispatch::{extension_of, ParserRegistry};
use super::error::ExtractError;
use super::fallback::FallbackLibrary;
use super::format::{error_html, placeholder_html};
use super::loader::{DocumentLoader, PickedFiles, SourceChain};
use super::types::{derive_title, filename_stem, CacheInfo, ExtractionOutcome, OutcomeSource};
use crate::config::Config;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 命中列表的扩展名每次访问都丢弃缓存后重新解析。
#[derive(Debug, Clone, Default)]
pub struct RevalidationPolicy {
    extensions: Vec<String>,
}

impl RevalidationPolicy {
    pub fn new(extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|item| normalize_extension(item))
            .filter(|item| !item.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn applies_to(&self, filename: &str) -> bool {
        let extension = extension_of(filename);
        !extension.is_empty() && self.extensions.iter().any(|item| *item == extension)
    }
}

pub struct DocumentExtractor {
    registry: ParserRegistry,
    loader: Arc<dyn DocumentLoader>,
    fallbacks: FallbackLibrary,
    revalidation: RevalidationPolicy,
    cache: Mutex<HashMap<String, ExtractionOutcome>>,
}

impl DocumentExtractor {
    pub fn new(
        registry: ParserRegistry,
        loader: Arc<dyn DocumentLoader>,
        fallbacks: FallbackLibrary,
        revalidation: RevalidationPolicy,
    ) -> Self {
        Self {
            registry,
            loader,
            fallbacks,
            revalidation,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config, picked_files: Arc<PickedFiles>) -> Self {
        let chain = SourceChain::from_config(&config.sources, picked_files);
        info!("document sources: {:?}", chain.source_names());
        Self::new(
            ParserRegistry::bootstrap(&config.formats),
            Arc::new(chain),
            FallbackLibrary::from_config(&config.fallback_documents),
            RevalidationPolicy::new(&config.cache.always_revalidate),
        )
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// 永不返回错误：失败时给出兜底内容、占位或错误片段。
    pub async fn extract(&self, filename: &str) -> ExtractionOutcome {
        if self.revalidation.applies_to(filename) && self.cache.lock().remove(filename).is_some() {
            debug!("cache entry revalidated: {filename}");
        }
        let cached = self.cache.lock().get(filename).cloned();
        if let Some(mut outcome) = cached {
            debug!("cache hit: {filename}");
            outcome.source = OutcomeSource::Cached;
            return outcome;
        }

        match self.extract_live(filename).await {
            Ok(outcome) => {
                self.cache
                    .lock()
                    .insert(filename.to_string(), outcome.clone());
                outcome
            }
            Err(err) if err.is_unexpected() => {
                error!("extraction of {filename} failed unexpectedly: {err}");
                error_outcome(filename, &err)
            }
            Err(err) => {
                warn!("extraction of {filename} degraded ({}): {err}", err.code());
                self.degraded_outcome(filename, &err)
            }
        }
    }

    async fn extract_live(&self, filename: &str) -> Result<ExtractionOutcome, ExtractError> {
        let parser = self.registry.resolve(filename)?;
        parser.ensure_ready()?;
        let bytes = self.loader.load(filename).await.map_err(|err| match err {
            ExtractError::Load(_) => err,
            other => ExtractError::Internal(format!("loader failed: {other}")),
        })?;

        let started = Instant::now();
        let format = parser.format();
        let file_size = bytes.len() as u64;
        let result = tokio::task::spawn_blocking(move || parser.parse(&bytes))
            .await
            .map_err(|err| ExtractError::Internal(format!("{format} parser task failed: {err}")))??;
        info!(
            "parsed {filename}: format={format}, bytes={file_size}, pages={}, elapsed_ms={}",
            result.page_count,
            started.elapsed().as_millis()
        );

        Ok(ExtractionOutcome {
            success: true,
            title: derive_title(&result.text, filename),
            html_content: result.html,
            text_content: Some(result.text),
            extracted_at: Utc::now(),
            file_size: Some(file_size),
            page_count: Some(result.page_count),
            source: OutcomeSource::RealFile,
            error: None,
        })
    }

    fn degraded_outcome(&self, filename: &str, err: &ExtractError) -> ExtractionOutcome {
        if let Some(document) = self.fallbacks.get(filename) {
            return ExtractionOutcome {
                success: true,
                title: document.title.clone(),
                html_content: document.content.clone(),
                text_content: None,
                extracted_at: Utc::now(),
                file_size: None,
                page_count: None,
                source: OutcomeSource::Fallback,
                error: None,
            };
        }
        let message = err.to_string();
        ExtractionOutcome {
            success: false,
            title: filename_stem(filename),
            html_content: placeholder_html(filename, Some(&message)),
            text_content: None,
            extracted_at: Utc::now(),
            file_size: None,
            page_count: None,
            source: OutcomeSource::Default,
            error: Some(message),
        }
    }

    /// 返回清除的条目数。
    pub fn clear_cache(&self) -> usize {
        let mut cache = self.cache.lock();
        let cleared = cache.len();
        cache.clear();
        info!("extraction cache cleared: {cleared} entries");
        cleared
    }

    /// 单个文件重新选择后丢弃旧结果。
    pub fn invalidate(&self, filename: &str) -> bool {
        self.cache.lock().remove(filename).is_some()
    }

    pub fn clear_format_cache(&self, extension: &str) -> usize {
        let extension = normalize_extension(extension);
        let mut cache = self.cache.lock();
        let before = cache.len();
        cache.retain(|filename, _| extension_of(filename) != extension);
        let cleared = before - cache.len();
        info!("extraction cache cleared for .{extension}: {cleared} entries");
        cleared
    }

    pub fn cache_info(&self) -> CacheInfo {
        let cache = self.cache.lock();
        let mut filenames: Vec<String> = cache.keys().cloned().collect();
        filenames.sort();
        CacheInfo {
            size: cache.len(),
            filenames,
        }
    }
}

fn error_outcome(filename: &str, err: &ExtractError) -> ExtractionOutcome {
    let message = err.to_string();
    ExtractionOutcome {
        success: false,
        title: filename_stem(filename),
        html_content: error_html(filename, &message),
        text_content: None,
        extracted_at: Utc::now(),
        file_size: None,
        page_count: None,
        source: OutcomeSource::Error,
        error: Some(message),
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revalidation_policy_matches_extension() {
        let policy = RevalidationPolicy::new(&[".PPTX".to_string(), " ".to_string()]);
        assert!(policy.applies_to("deck.pptx"));
        assert!(policy.applies_to("Deck.PpTx"));
        assert!(!policy.applies_to("deck.pdf"));
        assert!(!policy.applies_to("pptx"));
        assert!(!RevalidationPolicy::default().applies_to("deck.pptx"));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".DOCX "), "docx");
        assert_eq!(normalize_extension("pdf"), "pdf");
    }
}
