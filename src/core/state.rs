// 全局应用状态：集中初始化提取服务并在路由间共享。
use crate::config::Config;
use crate::services::extract::{DocumentExtractor, PickedFiles};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<DocumentExtractor>,
    pub picked_files: Arc<PickedFiles>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let picked_files = Arc::new(PickedFiles::new());
        let extractor = Arc::new(DocumentExtractor::from_config(&config, picked_files.clone()));
        info!(
            "extractor initialized (file_protocol_mode={}, ready={})",
            config.sources.file_protocol_mode,
            extractor.is_ready()
        );
        Self {
            config: Arc::new(config),
            extractor,
            picked_files,
        }
    }

    /// 测试或嵌入场景直接注入自定义的提取器。
    pub fn with_extractor(
        config: Config,
        extractor: Arc<DocumentExtractor>,
        picked_files: Arc<PickedFiles>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            extractor,
            picked_files,
        }
    }

    pub fn file_protocol_mode(&self) -> bool {
        self.config.sources.file_protocol_mode
    }
}
