// 文档字节加载：远端 HTTP、用户选择的本地文件或上传目录，按顺序各尝试一次。
use super::error::{ExtractError, LoadError, SourceAttempt};
use crate::config::SourcesConfig;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// 编排器依赖的加载接口，测试中可替换为计数桩。
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, filename: &str) -> Result<Bytes, ExtractError>;
}

/// 单个字节来源，失败原因由来源链汇总。
#[async_trait]
pub trait ByteSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, filename: &str) -> Result<Bytes>;
}

pub struct RemoteSource {
    http: reqwest::Client,
    base_url: Url,
}

impl RemoteSource {
    pub fn new(base_url: &str, timeout_s: Option<u64>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid remote_base_url: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("remote_base_url cannot be used as a base: {base_url}");
        }
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_s) = timeout_s {
            if timeout_s > 0 {
                builder = builder.timeout(Duration::from_secs(timeout_s));
            }
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    /// 文件名作为单个路径段编码后拼接到基础地址。
    pub fn document_url(&self, filename: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("remote_base_url cannot be used as a base"))?
            .pop_if_empty()
            .push(filename);
        Ok(url)
    }
}

#[async_trait]
impl ByteSource for RemoteSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn fetch(&self, filename: &str) -> Result<Bytes> {
        let url = self.document_url(filename)?;
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} from {url}", status.as_u16());
        }
        Ok(response.bytes().await?)
    }
}

/// 文件协议模式下用户选择的文件，按文件名保存原始字节。
#[derive(Default)]
pub struct PickedFiles {
    files: DashMap<String, Bytes>,
}

impl PickedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, filename: impl Into<String>, bytes: Bytes) {
        self.files.insert(filename.into(), bytes);
    }

    pub fn has(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<Bytes> {
        self.files.get(filename).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, filename: &str) -> bool {
        self.files.remove(filename).is_some()
    }

    pub fn filenames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

pub struct PickedFileSource {
    files: Arc<PickedFiles>,
}

impl PickedFileSource {
    pub fn new(files: Arc<PickedFiles>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl ByteSource for PickedFileSource {
    fn name(&self) -> &'static str {
        "picked_files"
    }

    async fn fetch(&self, filename: &str) -> Result<Bytes> {
        self.files
            .get(filename)
            .ok_or_else(|| anyhow!("not cached, select the file first"))
    }
}

pub struct UploadsDirSource {
    root: PathBuf,
}

impl UploadsDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ByteSource for UploadsDirSource {
    fn name(&self) -> &'static str {
        "uploads"
    }

    async fn fetch(&self, filename: &str) -> Result<Bytes> {
        if filename.trim().is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            bail!("rejected filename: {filename}");
        }
        let path = self.root.join(filename);
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        Ok(Bytes::from(data))
    }
}

/// 按顺序尝试各来源；全部失败时返回带每个来源原因的 LoadError。
pub struct SourceChain {
    sources: Vec<Arc<dyn ByteSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Arc<dyn ByteSource>>) -> Self {
        Self { sources }
    }

    /// 远端地址为空时跳过远端来源；文件协议模式只在启动时读取一次。
    pub fn from_config(config: &SourcesConfig, picked_files: Arc<PickedFiles>) -> Self {
        let mut sources: Vec<Arc<dyn ByteSource>> = Vec::new();
        let base_url = config.remote_base_url.trim();
        if !base_url.is_empty() {
            match RemoteSource::new(base_url, config.timeout_s) {
                Ok(source) => sources.push(Arc::new(source)),
                Err(err) => warn!("remote document source disabled: {err:#}"),
            }
        }
        if config.file_protocol_mode {
            sources.push(Arc::new(PickedFileSource::new(picked_files)));
        } else {
            sources.push(Arc::new(UploadsDirSource::new(config.uploads_dir.trim())));
        }
        Self::new(sources)
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }
}

#[async_trait]
impl DocumentLoader for SourceChain {
    async fn load(&self, filename: &str) -> Result<Bytes, ExtractError> {
        let mut attempts = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.fetch(filename).await {
                Ok(bytes) => {
                    debug!(
                        "loaded {filename} from {} ({} bytes)",
                        source.name(),
                        bytes.len()
                    );
                    return Ok(bytes);
                }
                Err(err) => {
                    debug!("source {} failed for {filename}: {err:#}", source.name());
                    attempts.push(SourceAttempt {
                        source: source.name().to_string(),
                        reason: format!("{err:#}"),
                    });
                }
            }
        }
        Err(LoadError {
            filename: filename.to_string(),
            attempts,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource {
        name: &'static str,
        result: Option<&'static [u8]>,
    }

    #[async_trait]
    impl ByteSource for StaticSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _filename: &str) -> Result<Bytes> {
            match self.result {
                Some(data) => Ok(Bytes::from_static(data)),
                None => bail!("{} unavailable", self.name),
            }
        }
    }

    #[test]
    fn test_document_url_encodes_single_segment() {
        let source = RemoteSource::new("http://docs.example.com/files/", None).unwrap();
        let url = source.document_url("季度 报告/v2?.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "http://docs.example.com/files/%E5%AD%A3%E5%BA%A6%20%E6%8A%A5%E5%91%8A%2Fv2%3F.pdf"
        );
        let source = RemoteSource::new("http://docs.example.com/files", None).unwrap();
        assert_eq!(
            source.document_url("a.pdf").unwrap().as_str(),
            "http://docs.example.com/files/a.pdf"
        );
    }

    #[test]
    fn test_remote_source_rejects_invalid_base() {
        assert!(RemoteSource::new("not a url", None).is_err());
        assert!(RemoteSource::new("mailto:docs@example.com", None).is_err());
    }

    #[test]
    fn test_picked_files_roundtrip() {
        let files = PickedFiles::new();
        files.insert("b.pdf", Bytes::from_static(b"b"));
        files.insert("a.pdf", Bytes::from_static(b"a"));
        assert!(files.has("a.pdf"));
        assert_eq!(files.get("a.pdf").unwrap(), Bytes::from_static(b"a"));
        assert_eq!(files.filenames(), vec!["a.pdf", "b.pdf"]);
        assert!(files.remove("a.pdf"));
        assert!(!files.has("a.pdf"));
        assert!(!files.remove("a.pdf"));
    }

    #[tokio::test]
    async fn test_picked_file_source_requires_selection() {
        let source = PickedFileSource::new(Arc::new(PickedFiles::new()));
        let err = source.fetch("missing.pdf").await.unwrap_err();
        assert!(err.to_string().contains("select the file first"));
    }

    #[tokio::test]
    async fn test_uploads_source_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = UploadsDirSource::new(dir.path());
        for name in ["../secret.pdf", "nested/a.pdf", "nested\\a.pdf", ".."] {
            let err = source.fetch(name).await.unwrap_err();
            assert!(err.to_string().contains("rejected filename"), "{name}");
        }
        std::fs::write(dir.path().join("ok.pdf"), b"%PDF").unwrap();
        assert_eq!(source.fetch("ok.pdf").await.unwrap(), Bytes::from_static(b"%PDF"));
    }

    #[tokio::test]
    async fn test_chain_returns_first_success_and_aggregates_failures() {
        let chain = SourceChain::new(vec![
            Arc::new(StaticSource {
                name: "first",
                result: None,
            }),
            Arc::new(StaticSource {
                name: "second",
                result: Some(b"payload"),
            }),
        ]);
        assert_eq!(chain.load("x.pdf").await.unwrap(), Bytes::from_static(b"payload"));

        let failing = SourceChain::new(vec![
            Arc::new(StaticSource {
                name: "first",
                result: None,
            }),
            Arc::new(StaticSource {
                name: "second",
                result: None,
            }),
        ]);
        match failing.load("x.pdf").await {
            Err(ExtractError::Load(err)) => {
                let sources: Vec<&str> = err.attempts.iter().map(|a| a.source.as_str()).collect();
                assert_eq!(sources, vec!["first", "second"]);
                assert!(err.to_string().contains("second (second unavailable)"));
            }
            other => panic!("unexpected: {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_from_config_selects_sources() {
        let picked = Arc::new(PickedFiles::new());
        let mut config = SourcesConfig::default();
        assert_eq!(
            SourceChain::from_config(&config, picked.clone()).source_names(),
            vec!["uploads"]
        );
        config.remote_base_url = "http://127.0.0.1:9/docs".to_string();
        config.file_protocol_mode = true;
        assert_eq!(
            SourceChain::from_config(&config, picked).source_names(),
            vec!["remote", "picked_files"]
        );
    }
}
