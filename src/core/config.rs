// 配置读取与覆盖合并：YAML 基础配置 + 可选覆盖文件 + 环境变量占位符展开。
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/docportal.yaml";
pub const DEFAULT_OVERRIDE_PATH: &str = "data/config/docportal.override.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub i18n: I18nConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub formats: FormatsConfig,
    #[serde(default)]
    pub fallback_documents: Vec<FallbackDocumentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_u16_from_any")]
    pub port: u16,
    #[serde(default)]
    pub allow_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8060,
            allow_origins: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    pub default_language: String,
    pub supported_languages: Vec<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_language: "zh-CN".to_string(),
            supported_languages: vec!["zh-CN".to_string(), "en-US".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log_level: String,
    /// `text`（默认）或 `json`。
    #[serde(default)]
    pub log_format: String,
}

/// 文档字节来源：远端地址、本地上传目录与文件协议模式。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub remote_base_url: String,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    #[serde(default)]
    pub file_protocol_mode: bool,
    #[serde(default)]
    pub timeout_s: Option<u64>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            remote_base_url: String::new(),
            uploads_dir: default_uploads_dir(),
            file_protocol_mode: false,
            timeout_s: None,
        }
    }
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 每次访问都强制重新解析的扩展名。
    #[serde(default = "default_always_revalidate")]
    pub always_revalidate: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            always_revalidate: default_always_revalidate(),
        }
    }
}

fn default_always_revalidate() -> Vec<String> {
    vec![".pptx".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FormatsConfig {
    /// 视为解析库不可用的格式（pdf/docx/pptx）。
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackDocumentConfig {
    pub filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

fn deserialize_u16_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    struct U16Visitor;

    impl<'de> Visitor<'de> for U16Visitor {
        type Value = u16;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("u16 or numeric string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u16::try_from(value).map_err(|_| E::custom("u16 out of range"))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value < 0 {
                return Err(E::custom("u16 must be non-negative"));
            }
            self.visit_u64(value as u64)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(E::custom("u16 string is empty"));
            }
            trimmed
                .parse::<u16>()
                .map_err(|_| E::custom("invalid u16 string"))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            self.visit_str(&value)
        }
    }

    deserializer.deserialize_any(U16Visitor)
}

pub fn load_config() -> Config {
    let base_path =
        env::var("DOCPORTAL_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let override_path = env::var("DOCPORTAL_CONFIG_OVERRIDE_PATH")
        .unwrap_or_else(|_| DEFAULT_OVERRIDE_PATH.to_string());
    load_config_from(Path::new(&base_path), Some(Path::new(&override_path)))
}

/// 从指定路径读取配置；覆盖文件存在时递归合并非空字段。
pub fn load_config_from(base_path: &Path, override_path: Option<&Path>) -> Config {
    let mut merged = read_yaml(base_path);
    if let Some(override_path) = override_path.filter(|path| path.exists()) {
        let override_value = read_yaml(override_path);
        merge_yaml(&mut merged, override_value);
    }

    expand_yaml_env(&mut merged);

    if merged.is_null() {
        return Config::default();
    }
    serde_yaml::from_value::<Config>(merged).unwrap_or_else(|err| {
        warn!("config parse failed, using defaults: {err}");
        Config::default()
    })
}

fn read_yaml(path: &Path) -> Value {
    // 配置文件允许不存在，首次启动直接使用默认值。
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!("read config failed: {}, {err}", path.display());
            return Value::Null;
        }
    };
    serde_yaml::from_str(&content).unwrap_or_else(|err| {
        warn!("parse yaml failed: {}, {err}", path.display());
        Value::Null
    })
}

fn merge_yaml(base: &mut Value, override_value: Value) {
    match (base, override_value) {
        (Value::Mapping(base_map), Value::Mapping(override_map)) => {
            for (key, value) in override_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, override_value) => {
            if !override_value.is_null() {
                *base_slot = override_value;
            }
        }
    }
}

fn expand_yaml_env(value: &mut Value) {
    match value {
        Value::String(text) => {
            *text = expand_env_placeholders(text);
        }
        Value::Sequence(items) => {
            for item in items {
                expand_yaml_env(item);
            }
        }
        Value::Mapping(map) => {
            for (_, value) in map.iter_mut() {
                expand_yaml_env(value);
            }
        }
        _ => {}
    }
}

fn expand_env_placeholders(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        rest = &rest[start + 2..];
        let Some(end) = rest.find('}') else {
            output.push_str("${");
            output.push_str(rest);
            return output;
        };
        let inner = &rest[..end];
        rest = &rest[end + 1..];
        let (name, default_value) = match inner.split_once(":-") {
            Some((name, default_value)) => (name.trim(), Some(default_value)),
            None => (inner.trim(), None),
        };
        if name.is_empty() {
            output.push_str("${");
            output.push_str(inner);
            output.push('}');
            continue;
        }
        let resolved = env::var(name).ok().filter(|value| !value.is_empty());
        match (resolved, default_value) {
            (Some(value), _) => output.push_str(&value),
            (None, Some(default_value)) => output.push_str(default_value),
            (None, None) => {}
        }
    }
    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_placeholders() {
        std::env::remove_var("DOCPORTAL_TEST_PLACEHOLDER");
        assert_eq!(
            expand_env_placeholders("${DOCPORTAL_TEST_PLACEHOLDER:-default}"),
            "default"
        );
        assert_eq!(
            expand_env_placeholders("http://${DOCPORTAL_TEST_PLACEHOLDER:-cdn}/docs"),
            "http://cdn/docs"
        );

        std::env::set_var("DOCPORTAL_TEST_PLACEHOLDER", "files.example");
        assert_eq!(
            expand_env_placeholders("http://${DOCPORTAL_TEST_PLACEHOLDER}/docs"),
            "http://files.example/docs"
        );

        std::env::remove_var("DOCPORTAL_TEST_PLACEHOLDER");
        assert_eq!(expand_env_placeholders("${DOCPORTAL_TEST_PLACEHOLDER}"), "");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.yaml"), None);
        assert_eq!(config.server.port, 8060);
        assert_eq!(config.cache.always_revalidate, vec![".pptx".to_string()]);
        assert_eq!(config.sources.uploads_dir, "uploads");
        assert!(!config.sources.file_protocol_mode);
    }

    #[test]
    fn test_override_merges_non_null_fields() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let over = dir.path().join("override.yaml");
        fs::write(
            &base,
            "server:\n  host: 127.0.0.1\n  port: \"9000\"\nsources:\n  remote_base_url: http://docs.example/files\n  uploads_dir: data/uploads\n",
        )
        .unwrap();
        fs::write(
            &over,
            "sources:\n  file_protocol_mode: true\ncache:\n  always_revalidate: []\nfallback_documents:\n  - filename: a.pdf\n    title: A\n    content: <p>a</p>\n",
        )
        .unwrap();

        let config = load_config_from(&base, Some(&over));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.sources.remote_base_url, "http://docs.example/files");
        assert_eq!(config.sources.uploads_dir, "data/uploads");
        assert!(config.sources.file_protocol_mode);
        assert!(config.cache.always_revalidate.is_empty());
        assert_eq!(config.fallback_documents.len(), 1);
        assert_eq!(config.fallback_documents[0].filename, "a.pdf");
    }
}
